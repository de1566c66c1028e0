use crate::error::{InstallError, Result};
use crate::types::*;
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "pie-fetch";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_CONFIG_PATH: &str = "PIE_FETCH_CONFIG";
pub const ENV_HOME: &str = "PIE_FETCH_HOME";
pub const ENV_MANIFEST_URL: &str = "PIE_FETCH_MANIFEST_URL";
pub const ENV_CHANNEL: &str = "PIE_FETCH_CHANNEL";
pub const ENV_ALLOW_UNVERIFIED: &str = "PIE_FETCH_ALLOW_UNVERIFIED";
pub const ENV_LOCK_TIMEOUT: &str = "PIE_FETCH_LOCK_TIMEOUT";
pub const ENV_LOCAL_BUILD: &str = "PIE_LOCAL_BUILD";

pub fn get_config_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return Ok(PathBuf::from(path));
    }
    let path = dirs::config_dir()
        .ok_or_else(|| InstallError::Settings("could not determine config directory".into()))?
        .join(APP_NAME)
        .join(CONFIG_FILE_NAME);
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

/// Load settings from the config file (if any), then apply environment
/// overrides.
pub fn load_settings() -> Result<Settings> {
    let config_path = get_config_file_path()?;

    let mut settings = if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        serde_json::from_str(&content).map_err(|e| {
            InstallError::Settings(format!(
                "could not parse {} as JSON: {}",
                config_path.display(),
                e
            ))
        })?
    } else {
        Settings::default()
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(home) = lookup(ENV_HOME).filter(|s| !s.is_empty()) {
        settings.install_root = PathBuf::from(home);
    }

    if let Some(url) = lookup(ENV_MANIFEST_URL).filter(|s| !s.is_empty()) {
        settings.manifest_url = url;
    }

    if let Some(channel) = lookup(ENV_CHANNEL).filter(|s| !s.is_empty()) {
        settings.channel = channel;
    }

    if let Some(allow) = lookup(ENV_ALLOW_UNVERIFIED) {
        settings.allow_unverified = allow.to_lowercase() == "true" || allow == "1";
    }

    if let Some(secs) = lookup(ENV_LOCK_TIMEOUT) {
        match secs.parse::<u64>() {
            Ok(secs) => settings.lock_timeout_secs = secs,
            Err(_) => tracing::warn!("Ignoring invalid {}={}", ENV_LOCK_TIMEOUT, secs),
        }
    }

    if let Some(local) = lookup(ENV_LOCAL_BUILD).filter(|s| !s.is_empty()) {
        settings.local_build = Some(PathBuf::from(local));
    }
}
