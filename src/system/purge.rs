use crate::models::RetryPolicy;
use crate::utils::error::{Result, UpdaterError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Removes every entry under `dir` except `dir` itself and any path
/// case-insensitively equal to `exclude`.
///
/// Directories are emptied file-by-file but never removed themselves: the
/// directory may still hold the excluded executable or a transiently locked
/// file. The whole walk is retried per `policy` when it errors; only the
/// final attempt's error is returned.
pub fn purge(dir: &Path, exclude: &Path, policy: RetryPolicy) -> Result<()> {
    purge_with(dir, exclude, policy, thread::sleep)
}

/// Same as [`purge`] with an injectable sleep, for deterministic tests.
pub fn purge_with(
    dir: &Path,
    exclude: &Path,
    policy: RetryPolicy,
    sleep: impl FnMut(Duration),
) -> Result<()> {
    // A relative install path and an absolute exclude (current_exe) must
    // still match; compare canonical forms.
    let dir = normalize_for_compare(dir);
    let exclude = normalize_for_compare(exclude);

    run_with_retry(policy, sleep, || purge_walk(&dir, &exclude)).map_err(|e| {
        UpdaterError::PurgeFailed {
            path: dir.clone(),
            attempts: policy.max_attempts.max(1),
            reason: e.to_string(),
        }
    })
}

/// Canonicalizes a path for exclusion comparison. Paths that do not exist
/// fall back to a canonicalized parent so the comparison stays meaningful.
fn normalize_for_compare(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Runs `op` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between attempts. Returns the final attempt's error.
fn run_with_retry(
    policy: RetryPolicy,
    mut sleep: impl FnMut(Duration),
    mut op: impl FnMut() -> io::Result<()>,
) -> io::Result<()> {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            debug!(attempt, max_attempts, "retrying purge walk");
            sleep(policy.delay);
        }
        match op() {
            Ok(()) => return Ok(()),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or_else(|| io::Error::other("purge walk never ran")))
}

fn purge_walk(dir: &Path, exclude: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if paths_equal_ignore_case(&path, exclude) {
            continue;
        }

        // Entries can disappear between listing and stat; that is fine.
        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        if metadata.is_dir() {
            remove_files_best_effort(&path, exclude);
            purge_walk(&path, exclude)?;
        } else {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
    }

    Ok(())
}

/// Deletes the plain files under `dir` recursively, swallowing per-file
/// errors. Locked files are left for the retried outer walk to report.
fn remove_files_best_effort(dir: &Path, exclude: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if paths_equal_ignore_case(&path, exclude) {
            continue;
        }
        let Ok(metadata) = fs::symlink_metadata(&path) else {
            continue;
        };
        if metadata.is_dir() {
            remove_files_best_effort(&path, exclude);
        } else {
            let _ = fs::remove_file(&path);
        }
    }
}

fn paths_equal_ignore_case(a: &Path, b: &Path) -> bool {
    a.to_string_lossy()
        .eq_ignore_ascii_case(&b.to_string_lossy())
}
