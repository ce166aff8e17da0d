use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use mailhook::{ExitStatus, RelayConfig, controller};
use mailhook_common::{internal, logging};

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

/// Relay mail received over SMTP to an HTTP webhook
#[derive(Parser, Debug)]
#[command(name = "mailhook", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the JSON configuration file
    ///
    /// Defaults to `$MAILHOOK_CONFIG`, then `./config.json`.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init();

    let config = match RelayConfig::load(cli.config) {
        Ok(config) => config,
        Err(err) => {
            internal!(level = ERROR, "{err}");
            return ExitStatus::Config.into();
        }
    };

    let status = controller::run(config).await;
    internal!(level = INFO, "Exiting with status {}", status.code());

    status.into()
}
