use crate::models::UpdaterConfig;
use crate::utils::error::{Result, UpdaterError};
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Starts the updated application from `target` without waiting for it or
/// capturing its output. The spawned process's working directory is the
/// install directory itself.
pub fn launch(target: &Path, config: &UpdaterConfig) -> Result<()> {
    let exe_path = target.join(config.executable_name());
    info!(path = %exe_path.display(), "launching application");

    Command::new(&exe_path)
        .current_dir(target)
        .spawn()
        .map(drop)
        .map_err(|e| UpdaterError::LaunchFailed {
            path: exe_path,
            reason: e.to_string(),
        })
}
