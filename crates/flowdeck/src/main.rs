mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flowdeck_core::{ConnectionManager, FlowService};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a backend connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Everything else goes through the flow service
        cmd => {
            let service = build_service(&cli.global)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &service, &cli.global).await;

            service.manager().shutdown().await;
            result
        }
    }
}

/// Build a `FlowService` from the config file plus CLI overrides.
fn build_service(global: &GlobalOpts) -> Result<FlowService, CliError> {
    let config = flowdeck_config::load_config_or_default();

    let mut settings = config.connection;
    if let Some(ref url) = global.url {
        settings.url = url.clone();
    }
    if let Some(timeout) = global.timeout {
        settings.timeout_secs = timeout;
    }

    let connection = settings.to_connection_config()?;
    Ok(FlowService::new(ConnectionManager::new(), connection)
        .with_limits(config.flows.to_flow_limits())
        .with_list_limit(config.flows.list_limit))
}
