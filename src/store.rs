use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const VERSION_FILE_NAME: &str = "version.txt";

/// The installed version id, kept as plain text in `version.txt`.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_root(install_root: &Path) -> Self {
        Self::new(install_root.join(VERSION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The recorded version, or `None` if nothing was ever installed.
    pub fn installed_version(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let version = content.trim();
                Ok((!version.is_empty()).then(|| version.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the recorded version. Readers see either the old or the new
    /// value, never a partial write.
    pub fn write_version(&self, version: &str) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(version.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!("Recorded version {} in {}", version, self.path.display());
        Ok(())
    }
}
