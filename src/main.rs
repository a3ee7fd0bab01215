mod app;
mod models;
mod system;
mod utils;

use anyhow::Context;
use app::Updater;
use clap::Parser;
use models::{UpdateRequest, UpdaterConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// In-place application updater: backs up the install directory, replaces
/// its contents with the downloaded archive and relaunches the application.
#[derive(Parser)]
#[command(name = "lumen-updater")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Application install path (may point at the inner `app` directory)
    #[arg(long)]
    path: PathBuf,

    /// Downloaded update archive (ZIP)
    #[arg(long)]
    file: PathBuf,

    /// Product name used for the relaunched executable and the archive
    /// root-folder heuristic
    #[arg(long, default_value = "LumenTV")]
    app_name: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    info!(
        "{} Updater v{}",
        cli.app_name,
        env!("CARGO_PKG_VERSION")
    );

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // The running updater binary must survive the purge even when it lives
    // inside the install directory.
    let exclude_path =
        std::env::current_exe().context("failed to determine updater executable path")?;

    let request = UpdateRequest {
        install_path: cli.path,
        archive_path: cli.file,
        exclude_path,
    };
    let updater = Updater::new(UpdaterConfig::new(cli.app_name));
    let outcome = updater.run(&request)?;

    if !outcome.relaunched {
        warn!(
            target = %outcome.target.display(),
            "update finished but the application was not relaunched"
        );
    }
    if outcome.backup_left_behind {
        warn!("backup directory was left behind and can be removed manually");
    }

    Ok(())
}
