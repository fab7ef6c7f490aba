use super::Filesystem;
use crate::core::{ManagerError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// [`Filesystem`] backed by the local disk.
///
/// Writes go through a temp file in the destination directory and are then
/// renamed into place, so a reader never sees a half-written unit file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for LocalFilesystem {
    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| ManagerError::filesystem(parent, e))?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| ManagerError::filesystem(parent, e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| ManagerError::filesystem(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| ManagerError::filesystem(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| ManagerError::filesystem(path, e.error))?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Nothing to delete at {}", path.display());
                Ok(())
            }
            Err(e) => Err(ManagerError::filesystem(path, e)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
