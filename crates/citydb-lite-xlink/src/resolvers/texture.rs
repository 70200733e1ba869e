// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Texture parameterization
//!
//! Resolvers of the appearance chain. They run in order within one lane:
//! coordinate lists and parameterizations write the texture parameter rows
//! that texture associations later copy.

use super::{failed, mismatched, PassContext, Resolution, ResolverContext, XlinkResolver};
use crate::batch::BatchWriter;
use citydb_lite_geometry::{
    parse_texture_coordinates, parse_world_to_texture, reverse_texture_rings,
};
use citydb_lite_model::{
    normalize_gml_id, IdType, LedgerSnapshot, PendingReference, Result, RowId, Table,
    TextureParamRow, Write, XlinkKind,
};
use std::sync::Arc;

/// Coordinates of a ring pending in the same mirror for the same surface data
fn ring_coordinates<'a>(
    snapshot: &'a LedgerSnapshot,
    ring_gml_id: &str,
    surface_data_id: RowId,
) -> Option<&'a str> {
    snapshot
        .find_by_symbolic_id(normalize_gml_id(ring_gml_id))
        .into_iter()
        .find_map(|record| match record {
            PendingReference::TextureCoordList(list) if list.surface_data_id == surface_data_id => {
                Some(list.coordinates.as_str())
            }
            _ => None,
        })
}

// ============================================================================
// Texture coordinate lists
// ============================================================================

/// Texture coordinates of one polygon as seen from the current mirror
enum PolygonCoordinates {
    Ready {
        surface_id: RowId,
        rings: Vec<Vec<f64>>,
    },
    Deferred,
    Failed(String),
}

/// Resolver for per-ring texture coordinates
///
/// Coordinates arrive per linear ring but are stored per polygon. The
/// record of the exterior ring collects the coordinates of every ring of
/// its polygon from the mirror and writes them. Records of interior rings
/// share the outcome of their polygon and write nothing.
pub struct TextureCoordListResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl TextureCoordListResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }

    fn polygon_coordinates(
        &self,
        polygon_gml_id: &str,
        surface_data_id: RowId,
        snapshot: &LedgerSnapshot,
    ) -> Result<PolygonCoordinates> {
        let rings = self.ctx.ledger.rings_of_surface(polygon_gml_id)?;

        let mut coordinates = Vec::with_capacity(rings.len());
        for (expected, entry) in rings.iter().enumerate() {
            if entry.ring_no as usize != expected {
                return Ok(PolygonCoordinates::Failed(format!(
                    "ring {} of '{}' is missing",
                    expected, polygon_gml_id
                )));
            }
            let Some(text) = ring_coordinates(snapshot, &entry.gml_id, surface_data_id) else {
                return Ok(PolygonCoordinates::Failed(format!(
                    "no texture coordinates for ring '{}'",
                    entry.gml_id
                )));
            };
            match parse_texture_coordinates(text) {
                Ok(ring) => coordinates.push(ring),
                Err(e) => return Ok(PolygonCoordinates::Failed(e.to_string())),
            }
        }

        let Some(surface) = self
            .ctx
            .ids
            .resolve(polygon_gml_id, IdType::SurfaceGeometry, false)?
        else {
            return Ok(PolygonCoordinates::Deferred);
        };
        let Some(surface_id) = surface.id else {
            return Ok(PolygonCoordinates::Deferred);
        };

        if surface.reverse {
            coordinates = match reverse_texture_rings(&coordinates) {
                Ok(reversed) => reversed,
                Err(e) => return Ok(PolygonCoordinates::Failed(e.to_string())),
            };
        }

        Ok(PolygonCoordinates::Ready {
            surface_id,
            rings: coordinates,
        })
    }
}

impl XlinkResolver for TextureCoordListResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::TextureCoordList
    }

    fn insert(&mut self, record: &PendingReference, pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::TextureCoordList(list) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let Some(ring) = self.ctx.ledger.linear_ring(&list.ring_gml_id)? else {
            return Ok(failed(self.kind(), record, "unknown linear ring"));
        };

        let polygon =
            self.polygon_coordinates(&ring.parent_gml_id, list.surface_data_id, pass.snapshot)?;
        let (surface_id, rings) = match polygon {
            // Written by the record of the exterior ring
            PolygonCoordinates::Ready { .. } if ring.ring_no != 0 => {
                return Ok(Resolution::Resolved)
            }
            PolygonCoordinates::Ready { surface_id, rings } => (surface_id, rings),
            PolygonCoordinates::Deferred => return Ok(Resolution::Deferred),
            PolygonCoordinates::Failed(reason) => {
                return Ok(failed(self.kind(), record, reason))
            }
        };

        self.writer.push(Write::InsertTextureParam(TextureParamRow {
            surface_geometry_id: surface_id,
            surface_data_id: list.surface_data_id,
            is_texture_parametrization: true,
            world_to_texture: None,
            texture_coordinates: Some(rings),
        }))?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}

// ============================================================================
// Texture parameterizations
// ============================================================================

/// Resolver for material and texture targets
///
/// A `TexCoordGen` target gets one row carrying its matrix. Any other
/// target is bound per polygon: an aggregate surface is expanded to its
/// leaf polygons.
pub struct TextureParamResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl TextureParamResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }
}

impl XlinkResolver for TextureParamResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::TextureParam
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::TextureParam(param) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let matrix = match param.world_to_texture.as_deref().map(parse_world_to_texture) {
            Some(Ok(matrix)) => Some(matrix),
            Some(Err(e)) => return Ok(failed(self.kind(), record, e)),
            None => None,
        };

        let target = self
            .ctx
            .ids
            .resolve(&param.target_uri, IdType::SurfaceGeometry, false)?
            .and_then(|entry| entry.id);
        let Some(target) = target else {
            return Ok(Resolution::Deferred);
        };

        if matrix.is_some() {
            self.writer.push(Write::InsertTextureParam(TextureParamRow {
                surface_geometry_id: target,
                surface_data_id: param.surface_data_id,
                is_texture_parametrization: true,
                world_to_texture: matrix,
                texture_coordinates: None,
            }))?;
            return Ok(Resolution::Resolved);
        }

        let rows = self.ctx.db.surface_geometry_hierarchy(target)?;
        if rows.is_empty() {
            return Ok(Resolution::Deferred);
        }

        let writes: Vec<Write> = rows
            .iter()
            .filter(|row| row.geometry.is_some())
            .map(|row| {
                Write::InsertTextureParam(TextureParamRow {
                    surface_geometry_id: row.id,
                    surface_data_id: param.surface_data_id,
                    is_texture_parametrization: false,
                    world_to_texture: None,
                    texture_coordinates: None,
                })
            })
            .collect();
        if writes.is_empty() {
            return Ok(failed(self.kind(), record, "target has no polygons"));
        }

        self.writer.extend(writes)?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}

// ============================================================================
// Texture associations
// ============================================================================

/// Resolver for targets that reuse another association's parameterization
pub struct TextureAssociationResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl TextureAssociationResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }

    fn surface_id(&self, uri: &str) -> Result<Option<RowId>> {
        Ok(self
            .ctx
            .ids
            .resolve(uri, IdType::SurfaceGeometry, false)?
            .and_then(|entry| entry.id))
    }
}

impl XlinkResolver for TextureAssociationResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::TextureAssociation
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::TextureAssociation(assoc) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let Some(source) = self.ctx.ledger.association_target(&assoc.gml_id)? else {
            return Ok(failed(self.kind(), record, "unknown texture association"));
        };
        let Some(source_surface) = self.surface_id(&source.target_uri)? else {
            return Ok(Resolution::Deferred);
        };

        let param = self
            .ctx
            .db
            .texture_params(source.surface_data_id)?
            .into_iter()
            .find(|p| p.surface_geometry_id == source_surface);
        let Some(param) = param else {
            return Ok(Resolution::Deferred);
        };

        let Some(own_surface) = self.surface_id(&assoc.target_uri)? else {
            return Ok(Resolution::Deferred);
        };

        let texture_coordinates = match param.world_to_texture {
            Some(_) => None,
            None => param.texture_coordinates,
        };
        self.writer.push(Write::InsertTextureParam(TextureParamRow {
            surface_geometry_id: own_surface,
            surface_data_id: assoc.surface_data_id,
            is_texture_parametrization: param.is_texture_parametrization,
            world_to_texture: param.world_to_texture,
            texture_coordinates,
        }))?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}

// ============================================================================
// Texture image links
// ============================================================================

/// Resolver that points surface data at a shared texture image
pub struct TextureImageLinkResolver {
    ctx: Arc<ResolverContext>,
    writer: BatchWriter,
}

impl TextureImageLinkResolver {
    pub fn new(ctx: Arc<ResolverContext>) -> Self {
        let writer = ctx.writer();
        Self { ctx, writer }
    }
}

impl XlinkResolver for TextureImageLinkResolver {
    fn kind(&self) -> XlinkKind {
        XlinkKind::TextureImageLink
    }

    fn insert(&mut self, record: &PendingReference, _pass: &PassContext<'_>) -> Result<Resolution> {
        let PendingReference::TextureImageLink(link) = record else {
            return Ok(mismatched(self.kind(), record));
        };

        let image = self
            .ctx
            .ids
            .resolve(&link.image_uri, IdType::TexImage, false)?
            .and_then(|entry| entry.id);
        let Some(image) = image else {
            return Ok(Resolution::Deferred);
        };

        self.writer.push(Write::UpdateColumn {
            table: Table::SurfaceData,
            column: "tex_image_id".into(),
            id: link.surface_data_id,
            value: image,
        })?;
        Ok(Resolution::Resolved)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}
