use crate::download::ArtifactFetcher;
use crate::error::{InstallError, Result};
use crate::extract::install_archive;
use crate::lock::InstallLock;
use crate::manifest::{resolve_version, ManifestClient};
use crate::paths::{InstallLayout, PathResolver};
use crate::retry::RetryPolicy;
use crate::store::VersionStore;
use crate::types::Settings;
use crate::verify::{sha256_hex, verify_sha256};
use reqwest::Client;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Installs the engine binary into a managed root and keeps track of which
/// version is there.
///
/// Multiple processes may call [`EngineInstaller::ensure_installed`] on the
/// same root at once; an exclusive lock on `install.lock` makes sure only one
/// of them downloads.
pub struct EngineInstaller {
    resolver: PathResolver,
    store: VersionStore,
    manifest: ManifestClient,
    fetcher: ArtifactFetcher,
    channel: String,
    lock_timeout: Duration,
    allow_unverified: bool,
}

impl EngineInstaller {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pie-fetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InstallError::Settings(format!("could not build HTTP client: {}", e)))?;
        let retry = RetryPolicy::new(settings.max_attempts, settings.retry_backoff());

        let resolver = PathResolver::from_settings(settings);
        let store = VersionStore::new(resolver.layout().version_path());

        Ok(Self {
            resolver,
            store,
            manifest: ManifestClient::new(
                client.clone(),
                &settings.manifest_url,
                settings.request_timeout(),
                retry,
            ),
            fetcher: ArtifactFetcher::new(client, settings.download_timeout(), retry)
                .with_progress(settings.show_progress),
            channel: settings.channel.clone(),
            lock_timeout: settings.lock_timeout(),
            allow_unverified: settings.allow_unverified,
        })
    }

    pub fn layout(&self) -> &InstallLayout {
        self.resolver.layout()
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Path to a runnable engine: the local build override if one is set,
    /// otherwise the managed install, downloading it first if needed.
    pub async fn engine_path(&self) -> Result<PathBuf> {
        match self.resolver.override_path() {
            Some(result) => result,
            None => self.ensure_installed().await,
        }
    }

    /// Make sure the managed binary exists, installing the channel's latest
    /// version if it does not.
    pub async fn ensure_installed(&self) -> Result<PathBuf> {
        let binary_path = self.layout().binary_path();

        if binary_path.exists() {
            return Ok(binary_path);
        }

        fs::create_dir_all(self.layout().root())?;

        {
            let _lock = InstallLock::acquire(self.layout().lock_path(), self.lock_timeout).await?;

            // Another process may have finished while we waited.
            if binary_path.exists() {
                tracing::debug!("Engine installed by another process while waiting for lock");
                return Ok(binary_path);
            }

            tracing::info!("Engine not found at {}, downloading", binary_path.display());
            self.install_locked(&self.channel, None).await?;
        }

        if !binary_path.exists() {
            return Err(InstallError::InstallIncomplete { path: binary_path });
        }

        Ok(binary_path)
    }

    /// Install `version` (or the channel's latest) regardless of what is
    /// currently installed. Returns the installed version id.
    pub async fn download_engine(&self, channel: &str, version: Option<&str>) -> Result<String> {
        fs::create_dir_all(self.layout().root())?;

        let installed = {
            let _lock = InstallLock::acquire(self.layout().lock_path(), self.lock_timeout).await?;
            self.install_locked(channel, version).await?
        };

        let binary_path = self.layout().binary_path();
        if !binary_path.exists() {
            return Err(InstallError::InstallIncomplete { path: binary_path });
        }

        Ok(installed)
    }

    /// The installed version, or `None` if nothing has been installed.
    pub fn installed_version(&self) -> Result<Option<String>> {
        self.store.installed_version()
    }

    /// The channel's latest version if it differs from the installed one.
    ///
    /// Always `None` when nothing is installed yet. Versions are compared as
    /// plain strings.
    pub async fn check_for_updates(&self, channel: &str) -> Result<Option<String>> {
        let Some(installed) = self.store.installed_version()? else {
            return Ok(None);
        };

        let manifest = self.manifest.fetch_manifest(channel).await?;
        if manifest.latest != installed {
            tracing::info!(
                "Engine update available on {}: {} -> {}",
                channel,
                installed,
                manifest.latest
            );
            Ok(Some(manifest.latest))
        } else {
            Ok(None)
        }
    }

    /// Install the latest version if [`Self::check_for_updates`] reports one.
    pub async fn update(&self, channel: &str) -> Result<Option<String>> {
        match self.check_for_updates(channel).await? {
            Some(latest) => self.download_engine(channel, Some(&latest)).await.map(Some),
            None => Ok(None),
        }
    }

    /// Full download-verify-extract-record cycle. Caller must hold the lock.
    async fn install_locked(&self, channel: &str, version: Option<&str>) -> Result<String> {
        let manifest = self.manifest.fetch_manifest(channel).await?;
        let (version, descriptor) = resolve_version(&manifest, channel, version)?;

        let expected = match descriptor.expected_sha256() {
            Some(expected) => expected.to_string(),
            None if self.allow_unverified => {
                tracing::warn!(
                    "No sha256 published for engine {}, installing without verification",
                    version
                );
                String::new()
            }
            None => return Err(InstallError::UnverifiedArtifact { version }),
        };

        tracing::info!("Downloading engine {} from {} channel", version, channel);
        let content = self.fetcher.fetch(&descriptor.url).await?;

        verify_sha256(&content, &expected)?;
        if expected.is_empty() {
            tracing::debug!("Unverified artifact sha256: {}", sha256_hex(&content));
        }

        let layout = self.layout();
        let binary_path = install_archive(&content, layout.root(), &layout.binary_rel())?;
        self.store.write_version(&version)?;

        tracing::info!(
            "Engine {} installed to {}",
            version,
            binary_path.display()
        );
        Ok(version)
    }
}
