// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External files: texture images, library objects and world files

use super::{failed, mismatched, PassContext, Resolution, ResolverContext, XlinkResolver};
use crate::batch::BatchWriter;
use crate::world_file;
use citydb_lite_model::{PendingReference, Result, Write, XlinkError, XlinkKind};
use std::io::Read;
use std::sync::Arc;

/// MIME type derived from the file extension
pub(crate) fn mime_type(uri: &str) -> Option<&'static str> {
    let ext = uri.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "tif" | "tiff" => Some("image/tiff"),
        "bmp" => Some("image/bmp"),
        "rgb" => Some("image/x-rgb"),
        _ => None,
    }
}

/// Outcome of reading a referenced file
enum Content {
    Bytes(Vec<u8>),
    Unavailable(XlinkError),
}

fn read_content(ctx: &ResolverContext, uri: &str) -> Result<Content> {
    let mut reader = match ctx.streams.open(uri) {
        Ok(reader) => reader,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => return Ok(Content::Unavailable(e)),
    };

    let mut data = Vec::new();
    if let Err(e) = reader.read_to_end(&mut data) {
        return Ok(Content::Unavailable(e.into()));
    }
    if data.is_empty() {
        return Ok(Content::Unavailable(XlinkError::stream(format!(
            "{}: zero-length file",
            uri
        ))));
    }
    Ok(Content::Bytes(data))
}

/// Resolver that streams a file into a binary column
///
/// Serves both texture images and library objects.
pub struct FileResolver {
    kind: XlinkKind,
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl FileResolver {
    pub fn new(kind: XlinkKind, ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { kind, ctx, writer }
    }
}

impl XlinkResolver for FileResolver {
    fn kind(&self) -> XlinkKind {
        self.kind
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let file = match (self.kind, record) {
            (XlinkKind::TextureImage, PendingReference::TextureImage(file))
            | (XlinkKind::LibraryObject, PendingReference::LibraryObject(file)) => file,
            _ => return Ok(mismatched(self.kind, record)),
        };

        let data = match read_content(&self.ctx, &file.file_uri)? {
            Content::Bytes(data) => data,
            Content::Unavailable(e) => return Ok(failed(self.kind, record, e)),
        };

        let write = if self.kind == XlinkKind::TextureImage {
            Write::UpdateTexImage {
                id: file.id,
                data,
                mime_type: mime_type(&file.file_uri).map(str::to_string),
            }
        } else {
            Write::UpdateLibraryObject { id: file.id, data }
        };
        self.writer.push(write)?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}

/// Resolver that reads the world file next to a georeferenced texture
pub struct WorldFileResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl WorldFileResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }
}

impl XlinkResolver for WorldFileResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::WorldFile
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::WorldFile(file) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        for candidate in world_file::candidates(&file.file_uri) {
            let data = match read_content(&self.ctx, &candidate)? {
                Content::Bytes(data) => data,
                Content::Unavailable(e) => {
                    log::trace!("no world file at {}: {}", candidate, e);
                    continue;
                }
            };

            let content = String::from_utf8_lossy(&data);
            let georeference = match world_file::parse(&candidate, &content) {
                Ok(georeference) => georeference,
                Err(e) => return Ok(failed(self.kind(), record, e)),
            };

            self.writer.push(Write::UpdateGeoreference {
                id: file.id,
                orientation: georeference.orientation,
                reference_point: georeference.reference_point,
            })?;
            return Ok(Resolution::Resolved);
        }

        Ok(failed(self.kind(), record, "no world file found"))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}
