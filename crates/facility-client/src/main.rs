//! facility CLI entry point.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::error;

use facility_client::cli::{Cli, Command, ConfigAction};
use facility_client::commands;
use facility_client::config::ClientConfig;
use facility_client::error::{ClientError, ClientResult};
use facility_client::rpc::RpcClient;
use facility_client::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let loaded = match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);

    // Initialize tracing
    if let Err(e) = init_tracing(&TracingConfig::for_client(&config)) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    // Run the command
    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        Command::Monitor { facility, duration } => {
            let mut client = RpcClient::connect(&config).await?;
            commands::facility::monitor(&mut client, &facility, Duration::from_secs(duration))
                .await
        }
        command => {
            let request = commands::facility::build_request(&command)?.ok_or_else(|| {
                ClientError::InvalidArgument(format!("{command:?} is not a request"))
            })?;
            let mut client = RpcClient::connect(&config).await?;
            commands::facility::execute(&mut client, &request).await
        }
    }
}
