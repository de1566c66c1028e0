//! pie-fetch - acquires, verifies and installs the proxy inference engine
//! binary so host applications never carry download or packaging logic.

pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod install;
pub mod lock;
pub mod manifest;
pub mod paths;
pub mod retry;
pub mod store;
pub mod types;
pub mod verify;


pub use error::{InstallError, Result};
pub use install::EngineInstaller;
pub use manifest::{resolve_version, ManifestClient};
pub use paths::{InstallLayout, PathResolver};
pub use store::VersionStore;
pub use types::{ArtifactDescriptor, Manifest, Settings};
pub use verify::{sha256_hex, verify_sha256};
