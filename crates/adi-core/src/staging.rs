use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use tempfile::TempPath;
use tracing::{info, warn};

/// Local copy of a fetched source document.
///
/// The file is removed when the guard is dropped, whichever way the import
/// ends. A failed removal is logged and never replaces the error in flight.
#[derive(Debug)]
pub struct StagedDocument {
    label: String,
    path: Option<TempPath>,
}

impl StagedDocument {
    /// Writes `contents` to a fresh file in `dir`, or the system temp dir.
    pub fn write(label: &str, contents: &[u8], dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("adi-").suffix(".json");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(contents)?;
        file.flush()?;

        Ok(Self {
            label: label.to_string(),
            path: Some(file.into_temp_path()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn open(&self) -> io::Result<BufReader<File>> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "staged document removed"))?;
        Ok(BufReader::new(File::open(path)?))
    }
}

impl Drop for StagedDocument {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let shown = path.display().to_string();

        match path.close() {
            Ok(()) => info!(path = %shown, "Deleted temporary {} from local filesystem", self.label),
            Err(err) => warn!(
                path = %shown,
                error = %err,
                "Failed to delete temporary {} from local filesystem",
                self.label
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn staged_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedDocument::write("data.json", b"[1, 2]", Some(dir.path())).unwrap();
        let path = staged.path().unwrap().to_path_buf();

        let mut contents = String::new();
        staged.open().unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "[1, 2]");
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_cleanup_does_not_replace_the_result() {
        fn stage_then_fail(dir: &Path) -> Result<(), String> {
            let staged =
                StagedDocument::write("data.json", b"[]", Some(dir)).map_err(|e| e.to_string())?;
            std::fs::remove_file(staged.path().unwrap()).unwrap();
            Err("parse failed".to_string())
        }

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(stage_then_fail(dir.path()), Err("parse failed".to_string()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_staging_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(StagedDocument::write("data.json", b"[]", Some(&missing)).is_err());
    }
}
