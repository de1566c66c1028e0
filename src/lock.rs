//! Cross-process install lock.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{InstallError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exclusive advisory lock on a file, released when dropped.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Wait up to `timeout` for the lock at `path`.
    pub async fn acquire(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let started = Instant::now();
        let mut announced = false;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!("Acquired install lock {}", path.display());
                    return Ok(Self { file, path });
                }
                Err(e) if is_contended(&e) => {
                    if started.elapsed() >= timeout {
                        return Err(InstallError::LockTimeout { path, timeout });
                    }
                    if !announced {
                        tracing::info!(
                            "Waiting for another process to finish installing ({})",
                            path.display()
                        );
                        announced = true;
                    }
                    tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        tracing::debug!("Released install lock {}", self.path.display());
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_lock_times_out_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("install.lock");
        let held = InstallLock::acquire(&path, Duration::from_secs(1)).await.unwrap();

        let err = InstallLock::acquire(&path, Duration::from_millis(250))
            .await
            .unwrap_err();
        match err {
            InstallError::LockTimeout { path: p, timeout } => {
                assert_eq!(p, path);
                assert_eq!(timeout, Duration::from_millis(250));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        drop(held);
    }

    #[tokio::test]
    async fn test_lock_is_reacquirable_after_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("install.lock");
        {
            let _lock = InstallLock::acquire(&path, Duration::from_secs(1)).await.unwrap();
        }
        let lock = InstallLock::acquire(&path, Duration::from_millis(100)).await.unwrap();
        assert_eq!(lock.path(), path.as_path());
    }
}
