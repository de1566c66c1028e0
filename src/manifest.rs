//! Release manifest lookup.
//!
//! The manifest service answers `GET <manifest_url>?channel=<channel>` with
//! the versions published on that channel and which one is the latest.

use std::time::Duration;

use reqwest::Client;

use crate::error::{InstallError, Result};
use crate::retry::RetryPolicy;
use crate::types::{ArtifactDescriptor, Manifest};

pub struct ManifestClient {
    client: Client,
    url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ManifestClient {
    pub fn new(client: Client, url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
            retry,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch a fresh manifest for `channel`. Nothing is cached between calls.
    pub async fn fetch_manifest(&self, channel: &str) -> Result<Manifest> {
        self.retry
            .run("manifest fetch", || self.fetch_once(channel))
            .await
    }

    async fn fetch_once(&self, channel: &str) -> Result<Manifest> {
        tracing::debug!("Fetching {} manifest from {}", channel, self.url);

        let fail = |reason: String, status: Option<u16>| InstallError::ManifestFetch {
            channel: channel.to_string(),
            url: self.url.clone(),
            reason,
            status,
        };

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .query(&[
                ("channel", channel),
                ("os", std::env::consts::OS),
                ("arch", std::env::consts::ARCH),
            ])
            .send()
            .await
            .map_err(|e| fail(e.to_string(), None))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(
                format!("server returned {}", status),
                Some(status.as_u16()),
            ));
        }

        // A body that is not a manifest is the server's answer, not a
        // transport hiccup, so it carries the (successful) status.
        response
            .json::<Manifest>()
            .await
            .map_err(|e| fail(format!("invalid manifest: {}", e), Some(status.as_u16())))
    }
}

/// Pick the version to install from `manifest`.
///
/// `None` means the channel's latest. Fails with
/// [`InstallError::VersionNotFound`] when the id has no descriptor.
pub fn resolve_version(
    manifest: &Manifest,
    channel: &str,
    requested: Option<&str>,
) -> Result<(String, ArtifactDescriptor)> {
    let version = requested.unwrap_or(&manifest.latest);

    match manifest.versions.get(version) {
        Some(descriptor) => Ok((version.to_string(), descriptor.clone())),
        None => {
            let available: Vec<&str> = manifest.versions.keys().map(String::as_str).collect();
            Err(InstallError::VersionNotFound {
                version: version.to_string(),
                channel: channel.to_string(),
                available: if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        serde_json::from_str(
            r#"{
                "latest": "1.2.0",
                "versions": {
                    "1.1.0": { "url": "https://x/old.tgz", "sha256": "" },
                    "1.2.0": { "url": "https://x/a.tgz", "sha256": "ABC123" }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_latest_by_default() {
        let m = manifest();
        let (version, descriptor) = resolve_version(&m, "stable", None).unwrap();
        assert_eq!(version, "1.2.0");
        assert_eq!(&descriptor, &m.versions["1.2.0"]);
        assert_eq!(descriptor.expected_sha256(), Some("ABC123"));
    }

    #[test]
    fn test_resolve_explicit_version() {
        let (version, descriptor) = resolve_version(&manifest(), "stable", Some("1.1.0")).unwrap();
        assert_eq!(version, "1.1.0");
        assert_eq!(descriptor.url, "https://x/old.tgz");
        assert_eq!(descriptor.expected_sha256(), None);
    }

    #[test]
    fn test_unknown_version_names_version_and_channel() {
        let err = resolve_version(&manifest(), "beta", Some("9.9.9")).unwrap_err();
        match &err {
            InstallError::VersionNotFound {
                version,
                channel,
                available,
            } => {
                assert_eq!(version, "9.9.9");
                assert_eq!(channel, "beta");
                assert_eq!(available, "1.1.0, 1.2.0");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("9.9.9"));
    }

    #[test]
    fn test_latest_missing_from_versions() {
        let m = Manifest {
            latest: "2.0.0".into(),
            versions: Default::default(),
        };
        let err = resolve_version(&m, "stable", None).unwrap_err();
        assert!(matches!(err, InstallError::VersionNotFound { ref available, .. } if available == "none"));
    }

    #[test]
    fn test_missing_sha256_field_parses() {
        let m: Manifest = serde_json::from_str(
            r#"{"latest":"1","versions":{"1":{"url":"https://x/1.tgz","sha256":null}}}"#,
        )
        .unwrap();
        assert_eq!(m.versions["1"].expected_sha256(), None);
    }
}
