use crate::error::{InstallError, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Archive;
use tempfile::TempDir;
use walkdir::WalkDir;

pub const STAGING_PREFIX: &str = ".staging-";

/// Unpack a gzip tarball into `install_root` so that `binary_rel` (relative to
/// the root) only appears once every other file is in place.
///
/// The archive is unpacked into a staging directory inside the root, then
/// each file is renamed into its final location with the binary moved last.
/// Returns the installed binary path.
pub fn install_archive(content: &[u8], install_root: &Path, binary_rel: &Path) -> Result<PathBuf> {
    fs::create_dir_all(install_root)?;

    // Dropping the TempDir removes whatever is left of the staging tree.
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(install_root)?;
    tracing::debug!("Staging extraction in {}", staging.path().display());

    unpack_tar_gz(content, staging.path())?;

    let staged_binary = staging.path().join(binary_rel);
    if !staged_binary.is_file() {
        return Err(InstallError::InstallIncomplete {
            path: install_root.join(binary_rel),
        });
    }

    make_executable(&staged_binary)?;
    promote(&staging, install_root, binary_rel)?;

    Ok(install_root.join(binary_rel))
}

fn unpack_tar_gz(content: &[u8], dest: &Path) -> Result<()> {
    let decoder = GzDecoder::new(content);
    let mut archive = Archive::new(decoder);

    let entries = archive
        .entries()
        .map_err(|e| InstallError::Extract(e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| InstallError::Extract(e.to_string()))?;
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| InstallError::Extract(e.to_string()))?;
        if !unpacked {
            let name = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(InstallError::Extract(format!(
                "unsafe path in archive: {}",
                name
            )));
        }
    }

    Ok(())
}

fn promote(staging: &TempDir, install_root: &Path, binary_rel: &Path) -> Result<()> {
    let staged_binary = staging.path().join(binary_rel);

    for entry in WalkDir::new(staging.path()).min_depth(1) {
        let entry = entry.map_err(|e| InstallError::Extract(e.to_string()))?;
        if entry.file_type().is_dir() || entry.path() == staged_binary {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(staging.path())
            .map_err(|e| InstallError::Extract(e.to_string()))?;
        move_into_place(entry.path(), &install_root.join(relative))?;
    }

    move_into_place(&staged_binary, &install_root.join(binary_rel))
}

fn move_into_place(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    // rename() only replaces existing files on Unix
    #[cfg(not(unix))]
    {
        if to.exists() {
            fs::remove_file(to)?;
        }
    }

    fs::rename(from, to)?;
    Ok(())
}

fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
