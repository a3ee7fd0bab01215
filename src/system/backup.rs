use crate::utils::error::{Result, UpdaterError};
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Recursively copies `src` into `dst`, recreating directories with their
/// original permission mode. File contents are copied byte-for-byte with
/// default permissions.
///
/// Any read/write/stat failure aborts the whole backup: a partial backup
/// must never be trusted for rollback.
pub fn backup(src: &Path, dst: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(src)?;
    if !metadata.is_dir() {
        return Err(UpdaterError::NotADirectory {
            path: src.to_path_buf(),
        });
    }

    fs::create_dir_all(dst)?;
    fs::set_permissions(dst, metadata.permissions())?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let entry_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            backup(&entry_path, &dst_path)?;
        } else {
            copy_file(&entry_path, &dst_path)?;
        }
    }

    Ok(())
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    let mut reader = File::open(src)?;
    let mut writer = File::create(dst)?;
    io::copy(&mut reader, &mut writer)?;
    Ok(())
}

/// Replaces `target` with the backup tree by rename.
///
/// This is the only rollback primitive. It is invoked once, best-effort,
/// when a destructive stage fails; a restore failure is reported and never
/// retried.
pub fn restore(backup_path: &Path, target: &Path) -> Result<()> {
    let fail = |reason: String| UpdaterError::RestoreFailed {
        backup: backup_path.to_path_buf(),
        target: target.to_path_buf(),
        reason,
    };

    if target.exists() {
        fs::remove_dir_all(target).map_err(|e| fail(e.to_string()))?;
    }
    fs::rename(backup_path, target).map_err(|e| fail(e.to_string()))
}
