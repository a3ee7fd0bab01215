use crate::models::{UpdateOutcome, UpdateRequest, UpdateStage, UpdaterConfig};
use crate::system;
use crate::utils::error::{Result, UpdaterError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Sequences the update workflow and decides when to roll back.
///
/// Stages run strictly in order: resolving, backing up, purging, extracting,
/// cleaning the backup, launching. A purge or extract failure restores the
/// backup best-effort; failures after extraction never roll back because the
/// new files are already correctly in place.
pub struct Updater {
    config: UpdaterConfig,
}

impl Updater {
    pub fn new(config: UpdaterConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        self.run_with(request, |target| {
            system::purge(target, &request.exclude_path, self.config.retry)
        })
    }

    /// The purge stage is injectable so orchestration around an exhausted
    /// retry budget can be exercised without a real file lock.
    fn run_with(
        &self,
        request: &UpdateRequest,
        purge_stage: impl FnOnce(&Path) -> Result<()>,
    ) -> Result<UpdateOutcome> {
        self.report(UpdateStage::Resolving);
        let target = system::resolve(&request.install_path, &request.archive_path)?;
        let backup_path = backup_path_for(&target);
        info!(
            target = %target.display(),
            archive = %request.archive_path.display(),
            backup = %backup_path.display(),
            exclude = %request.exclude_path.display(),
            "starting update"
        );

        // Nothing destructive has happened yet; a backup failure is fatal
        // without any compensation.
        self.report(UpdateStage::BackingUp);
        system::backup(&target, &backup_path)?;

        self.report(UpdateStage::Purging);
        if let Err(e) = purge_stage(&target) {
            return Err(self.rollback(&backup_path, &target, e));
        }

        self.report(UpdateStage::Extracting);
        if let Err(e) = system::extract(&request.archive_path, &target, &self.config) {
            return Err(self.rollback(&backup_path, &target, e));
        }

        // From here on the new files are in place; rollback would be
        // destructive and wrong.
        self.report(UpdateStage::CleaningBackup);
        let backup_left_behind = match fs::remove_dir_all(&backup_path) {
            Ok(()) => false,
            Err(e) => {
                warn!(backup = %backup_path.display(), %e, "could not remove backup directory");
                true
            }
        };

        self.report(UpdateStage::Launching);
        let relaunched = match system::launch(&target, &self.config) {
            Ok(()) => true,
            Err(e) => {
                error!(%e, "relaunch failed; updated files remain in place");
                false
            }
        };

        info!("update completed");
        Ok(UpdateOutcome {
            target,
            relaunched,
            backup_left_behind,
        })
    }

    /// Best-effort compensation after a destructive stage failed. A restore
    /// failure supersedes the stage error: the install is now in an
    /// inconsistent state and that must be surfaced prominently.
    fn rollback(&self, backup_path: &Path, target: &Path, cause: UpdaterError) -> UpdaterError {
        error!(%cause, "update failed, restoring backup");
        match system::restore(backup_path, target) {
            Ok(()) => {
                info!(target = %target.display(), "backup restored");
                cause
            }
            Err(restore_error) => {
                error!(%restore_error, "restore failed; install directory is inconsistent");
                restore_error
            }
        }
    }

    fn report(&self, stage: UpdateStage) {
        info!(stage = stage.display_name(), "stage started");
    }
}

/// Sibling backup location for a resolved target directory.
fn backup_path_for(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_os_string();
    os.push(".backup");
    PathBuf::from(os)
}
