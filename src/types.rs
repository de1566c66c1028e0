use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MANIFEST_URL: &str = "https://prod.proxy.ing/functions/v1/get-release-manifest";
pub const DEFAULT_CHANNEL: &str = "stable";
pub const DEFAULT_BINARY_NAME: &str = "proxy_inference_engine";

/// Release manifest for a single channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub latest: String,
    #[serde(default)]
    pub versions: BTreeMap<String, ArtifactDescriptor>,
}

/// Where to download one version from, and what it should hash to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub url: String,
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ArtifactDescriptor {
    /// The published hash, if there is a non-blank one.
    pub fn expected_sha256(&self) -> Option<&str> {
        self.sha256
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
    #[serde(default)]
    pub local_build: Option<PathBuf>,
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub allow_unverified: bool,
    /// Draw a progress bar while downloading. Not persisted.
    #[serde(skip)]
    pub show_progress: bool,
}

fn default_install_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".orchard")
}
fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.to_string()
}
fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}
fn default_binary_name() -> String {
    DEFAULT_BINARY_NAME.to_string()
}
fn default_lock_timeout_secs() -> u64 {
    // slow connections can keep the lock for a while
    300
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_download_timeout_secs() -> u64 {
    600
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}

impl Settings {
    /// Default settings rooted at `install_root`.
    pub fn with_root(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            ..Self::default()
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            manifest_url: default_manifest_url(),
            channel: default_channel(),
            binary_name: default_binary_name(),
            local_build: None,
            lock_timeout_secs: default_lock_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            allow_unverified: false,
            show_progress: false,
        }
    }
}
