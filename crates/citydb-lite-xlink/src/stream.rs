// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File stream opener for texture images, library objects and world files

use citydb_lite_model::{Result, StreamOpener, XlinkError};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use url::Url;

/// Opens references as local files
///
/// `file:` URLs are converted to paths; relative references are resolved
/// against the directory of the imported file.
#[derive(Clone, Debug)]
pub struct FileStreamOpener {
    import_root: PathBuf,
}

impl FileStreamOpener {
    /// Create an opener that resolves relative references against `import_root`
    pub fn new(import_root: impl Into<PathBuf>) -> Self {
        Self {
            import_root: import_root.into(),
        }
    }

    /// Directory relative references are resolved against
    pub fn import_root(&self) -> &Path {
        &self.import_root
    }

    /// Turn a reference into a local path
    pub fn resolve_path(&self, reference: &str) -> Result<PathBuf> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(XlinkError::stream("empty file reference"));
        }

        match Url::parse(reference) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| XlinkError::stream(format!("invalid file URL: {}", reference))),
            // Single letter schemes are drive letters
            Ok(url) if url.scheme().len() > 1 => Err(XlinkError::stream(format!(
                "unsupported scheme '{}': {}",
                url.scheme(),
                reference
            ))),
            _ => {
                let path = Path::new(reference);
                if path.is_absolute() {
                    Ok(path.to_path_buf())
                } else {
                    Ok(self.import_root.join(path))
                }
            }
        }
    }
}

impl StreamOpener for FileStreamOpener {
    fn open(&self, reference: &str) -> Result<Box<dyn Read + Send>> {
        let path = self.resolve_path(reference)?;

        let metadata = std::fs::metadata(&path)
            .map_err(|e| XlinkError::stream(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(XlinkError::stream(format!("{}: not a file", path.display())));
        }
        if metadata.len() == 0 {
            return Err(XlinkError::stream(format!("{}: zero-length file", path.display())));
        }

        let file = File::open(&path)
            .map_err(|e| XlinkError::stream(format!("{}: {}", path.display(), e)))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_relative_reference() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("appearance")).unwrap();
        let mut file = File::create(dir.path().join("appearance/tex.png")).unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let opener = FileStreamOpener::new(dir.path());
        let mut data = Vec::new();
        opener
            .open("appearance/tex.png")
            .unwrap()
            .read_to_end(&mut data)
            .unwrap();
        assert_eq!(data, b"\x89PNG");
    }

    #[test]
    fn test_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.gml");
        std::fs::write(&path, "<gml/>").unwrap();

        let url = Url::from_file_path(&path).unwrap();
        let opener = FileStreamOpener::new("/nonexistent");
        assert_eq!(opener.resolve_path(url.as_str()).unwrap(), path);
        assert!(opener.open(url.as_str()).is_ok());
    }

    #[test]
    fn test_missing_and_empty_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.jpg"), b"").unwrap();

        let opener = FileStreamOpener::new(dir.path());
        let err = opener.open("missing.jpg").err().unwrap();
        assert!(!err.is_fatal());
        assert!(opener.open("empty.jpg").is_err());
        assert!(opener.open("http://example.com/tex.jpg").is_err());
    }
}
