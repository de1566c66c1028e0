//! Error types for engine installation.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Every way acquiring or installing the engine can fail.
///
/// Variants are kept distinct so callers can tell a bad override apart from a
/// lock timeout, a manifest problem, a failed download, a hash mismatch or a
/// broken package.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The local build override is set but does not contain the binary.
    #[error("PIE_LOCAL_BUILD is set but the engine binary was not found: {}", path.display())]
    Configuration { path: PathBuf },

    /// Another process held the install lock for longer than allowed.
    #[error(
        "timed out after {}s waiting for install lock {}",
        timeout.as_secs(),
        path.display()
    )]
    LockTimeout { path: PathBuf, timeout: Duration },

    /// The release manifest could not be fetched or decoded.
    #[error("failed to fetch {channel} manifest from {url}: {reason}")]
    ManifestFetch {
        channel: String,
        url: String,
        reason: String,
        status: Option<u16>,
    },

    #[error("version {version} not found in {channel} channel (available: {available})")]
    VersionNotFound {
        version: String,
        channel: String,
        available: String,
    },

    #[error("failed to download {url}: {reason}")]
    Download {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    #[error("SHA256 mismatch\n  expected: {expected}\n  actual:   {actual}")]
    Integrity { expected: String, actual: String },

    /// The manifest publishes no hash and unverified installs are not allowed.
    #[error(
        "version {version} has no sha256 in the manifest; \
         set allow_unverified (PIE_FETCH_ALLOW_UNVERIFIED=1) to install it anyway"
    )]
    UnverifiedArtifact { version: String },

    #[error("failed to extract archive: {0}")]
    Extract(String),

    /// Every step succeeded but the binary is not where it should be.
    #[error("install finished but the engine binary is missing: {}", path.display())]
    InstallIncomplete { path: PathBuf },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Transport failures (no status), 5xx and 429 are transient. Anything
    /// else is a definitive answer from the server.
    pub fn is_transient(&self) -> bool {
        match self {
            InstallError::ManifestFetch { status, .. } | InstallError::Download { status, .. } => {
                match status {
                    None => true,
                    Some(code) => *code >= 500 || *code == 429,
                }
            }
            _ => false,
        }
    }
}

/// Result alias for installer operations.
pub type Result<T> = std::result::Result<T, InstallError>;
