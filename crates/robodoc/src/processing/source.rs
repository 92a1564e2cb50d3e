//! Scoped ownership of a document's source file

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

use crate::error::Result;

/// Source file handed to the pipeline
///
/// A staged upload is a temporary copy owned by this guard and deleted when
/// the guard drops, whichever way processing ends. An existing file is only
/// borrowed and left in place.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    staged: Option<TempPath>,
}

impl SourceFile {
    /// Write `bytes` to a temporary file in `dir`
    ///
    /// The extension of `original_filename` is kept so text extraction can
    /// pick the right parser.
    pub fn staged(bytes: &[u8], dir: &Path, original_filename: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let suffix = Path::new(original_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        let staged = file.into_temp_path();
        Ok(Self {
            path: staged.to_path_buf(),
            staged: Some(staged),
        })
    }

    /// Refer to a file that outlives processing
    pub fn existing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceFile::staged(b"INVOICE", dir.path(), "invoice.PDF").unwrap();
        let path = source.path().to_path_buf();

        assert!(source.is_staged());
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("PDF"));
        assert_eq!(std::fs::read(&path).unwrap(), b"INVOICE");

        drop(source);
        assert!(!path.exists());
    }

    #[test]
    fn test_existing_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.txt");
        std::fs::write(&path, "INVOICE").unwrap();

        drop(SourceFile::existing(&path));
        assert!(path.exists());
    }

    #[test]
    fn test_staged_file_removed_on_panic() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceFile::staged(b"x", dir.path(), "scan").unwrap();
        let path = source.path().to_path_buf();

        let result = std::panic::catch_unwind(move || {
            let _guard = source;
            panic!("stage blew up");
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
