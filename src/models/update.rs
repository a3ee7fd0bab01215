use std::path::PathBuf;
use std::time::Duration;

/// Caller-supplied inputs for one update run.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Install path as given on the command line (may point at an inner
    /// `app` subdirectory).
    pub install_path: PathBuf,
    /// Downloaded update archive (ZIP).
    pub archive_path: PathBuf,
    /// Path that purge must never delete. Normally the running updater
    /// executable, which may live inside the install directory.
    pub exclude_path: PathBuf,
}

/// Retry behavior for the purge walk.
///
/// A just-exited application can still hold file handles for a moment on
/// some platforms; a short fixed backoff absorbs that race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(500),
        }
    }
}

/// Updater settings that are fixed per product build.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Product name, used both for the relaunched executable name and for
    /// the archive root-folder heuristic.
    pub product_name: String,
    pub retry: RetryPolicy,
}

impl UpdaterConfig {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Platform-specific executable file name.
    pub fn executable_name(&self) -> String {
        if cfg!(windows) {
            format!("{}.exe", self.product_name)
        } else {
            self.product_name.clone()
        }
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self::new("LumenTV")
    }
}

/// Stages of the update workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Resolving,
    BackingUp,
    Purging,
    Extracting,
    CleaningBackup,
    Launching,
}

impl UpdateStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            UpdateStage::Resolving => "resolving",
            UpdateStage::BackingUp => "backing up",
            UpdateStage::Purging => "purging",
            UpdateStage::Extracting => "extracting",
            UpdateStage::CleaningBackup => "cleaning backup",
            UpdateStage::Launching => "launching",
        }
    }
}

/// Result of a completed update run.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// Resolved install directory that received the new files.
    pub target: PathBuf,
    /// False when the new files are in place but the relaunch failed; the
    /// update itself is still considered successful in that case.
    pub relaunched: bool,
    /// True when the backup directory could not be removed after a
    /// successful update.
    pub backup_left_behind: bool,
}
