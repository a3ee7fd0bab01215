use crate::utils::error::{Result, UpdaterError};
use std::path::{Path, PathBuf};

/// Maps the caller-supplied install path to the directory that actually
/// receives the update.
///
/// Packaged desktop builds place the runtime under an inner `app`
/// subdirectory; when the caller points at that, the real install root is
/// its parent.
pub fn resolve_target(install_path: &Path) -> PathBuf {
    let is_app_dir = install_path
        .file_name()
        .map(|name| name.to_string_lossy().eq_ignore_ascii_case("app"))
        .unwrap_or(false);

    if is_app_dir {
        match install_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => install_path.to_path_buf(),
        }
    } else {
        install_path.to_path_buf()
    }
}

/// Resolves and validates the update inputs. No side effects.
///
/// Fails when the resolved target directory or the archive file does not
/// exist on disk.
pub fn resolve(install_path: &Path, archive_path: &Path) -> Result<PathBuf> {
    let target = resolve_target(install_path);

    if !target.exists() {
        return Err(UpdaterError::PathNotFound { path: target });
    }
    if !target.is_dir() {
        return Err(UpdaterError::NotADirectory { path: target });
    }
    if !archive_path.exists() {
        return Err(UpdaterError::PathNotFound {
            path: archive_path.to_path_buf(),
        });
    }

    Ok(target)
}
