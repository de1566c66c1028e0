//! Where the engine binary lives.

use std::path::{Path, PathBuf};

use crate::error::{InstallError, Result};
use crate::store::VERSION_FILE_NAME;
use crate::types::Settings;

pub const BIN_DIR_NAME: &str = "bin";
pub const LOCK_FILE_NAME: &str = "install.lock";

/// File layout of a managed install root.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
    binary_name: String,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            binary_name: binary_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Binary path relative to the root (and to the archive root).
    pub fn binary_rel(&self) -> PathBuf {
        Path::new(BIN_DIR_NAME).join(&self.binary_name)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.root.join(self.binary_rel())
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    pub fn version_path(&self) -> PathBuf {
        self.root.join(VERSION_FILE_NAME)
    }
}

/// Resolves the engine binary location, honouring a local build override.
#[derive(Debug, Clone)]
pub struct PathResolver {
    layout: InstallLayout,
    local_build: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(layout: InstallLayout, local_build: Option<PathBuf>) -> Self {
        Self {
            layout,
            local_build,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            InstallLayout::new(&settings.install_root, &settings.binary_name),
            settings.local_build.clone(),
        )
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// `None` without an override. With one, the binary inside it or a
    /// configuration error; never the managed path.
    pub fn override_path(&self) -> Option<Result<PathBuf>> {
        let local_build = self.local_build.as_ref()?;
        let path = local_build.join(self.layout.binary_rel());
        if path.exists() {
            tracing::debug!("Using local engine build: {}", path.display());
            Some(Ok(path))
        } else {
            Some(Err(InstallError::Configuration { path }))
        }
    }

    /// The path the engine binary is (or will be) at. Does not download.
    pub fn resolve(&self) -> Result<PathBuf> {
        match self.override_path() {
            Some(result) => result,
            None => Ok(self.layout.binary_path()),
        }
    }
}
