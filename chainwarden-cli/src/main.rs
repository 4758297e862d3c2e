use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use chainwarden_cli::cli::{Cli, Commands};
use chainwarden_cli::commands::{self, scorecard};
use chainwarden_cli::shutdown::wait_for_shutdown_signal;
use chainwarden_cli::{CliError, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "chainwarden failed");
            eprintln!("chainwarden: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = commands::load_config(&cli.config).await?;
    commands::apply_log_overrides(
        &mut config,
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
    );

    match cli.command {
        Commands::Scorecard(args) => {
            scorecard::apply_overrides(&mut config, &args);
            config.validate()?;

            logging::init_tracing(&config.general).map_err(|e| CliError::Setup(e.to_string()))?;
            chainwarden_core::metrics::describe_all();
            info!(config = %cli.config.display(), "chainwarden starting");

            let summary = scorecard::execute(&config, termination()).await?;
            if summary.interrupted {
                info!(passes = summary.passes, "chainwarden shut down");
            }
            Ok(())
        }
    }
}

async fn termination() {
    match wait_for_shutdown_signal().await {
        Ok(signal) => info!(signal, "shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to install signal handlers, running until done");
            std::future::pending::<()>().await;
        }
    }
}
