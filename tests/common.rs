use flate2::write::GzEncoder;
use flate2::Compression;
use pie_fetch::Settings;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const BINARY_NAME: &str = "proxy_inference_engine";

// Each test binary only uses part of these helpers.
#[allow(dead_code)]
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
    pub home: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let home = temp_dir.path().join("engine-home");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_pie-fetch"));

        Self {
            temp_dir,
            config_path,
            home,
            bin_path,
        }
    }

    pub fn binary_path(&self) -> PathBuf {
        self.home.join("bin").join(BINARY_NAME)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("PIE_FETCH_CONFIG", &self.config_path);
        cmd.env("PIE_FETCH_HOME", &self.home);
        cmd.env_remove("PIE_LOCAL_BUILD");
        cmd.env_remove("PIE_FETCH_MANIFEST_URL");
        cmd.env_remove("PIE_FETCH_CHANNEL");
        cmd.env_remove("PIE_FETCH_ALLOW_UNVERIFIED");
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_exit_code(&self, code: i32) -> &Self {
        assert_eq!(
            self.status.code(),
            Some(code),
            "unexpected exit status\nstdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}

/// Settings for an isolated root talking to a local manifest server.
#[allow(dead_code)]
pub fn test_settings(root: &Path, manifest_url: String) -> Settings {
    Settings {
        install_root: root.to_path_buf(),
        manifest_url,
        binary_name: BINARY_NAME.to_string(),
        lock_timeout_secs: 10,
        max_attempts: 2,
        retry_backoff_ms: 0,
        ..Settings::default()
    }
}

/// A release tarball the way the packaging pipeline produces it: the engine
/// under `bin/` (deliberately without the executable bit) plus a data file.
#[allow(dead_code)]
pub fn engine_tarball(version: &str) -> Vec<u8> {
    let binary = format!("bin/{}", BINARY_NAME);
    let script = format!("#!/bin/sh\necho \"engine {}\"\n", version);
    tarball(&[
        (binary.as_str(), script.as_str(), 0o644),
        ("share/NOTICE", "engine notice\n", 0o644),
    ])
}

#[allow(dead_code)]
pub fn tarball(files: &[(&str, &str, u32)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, data, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, data.as_bytes())
            .expect("Failed to append tar entry");
    }
    builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .expect("Failed to finish tarball")
}

/// Manifest JSON with a single published version.
#[allow(dead_code)]
pub fn manifest_json(latest: &str, url: &str, sha256: &str) -> serde_json::Value {
    serde_json::json!({
        "latest": latest,
        "versions": {
            latest: { "url": url, "sha256": sha256 }
        }
    })
}

#[allow(dead_code)]
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
