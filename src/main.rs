//! Civic Issue Gateway - single front door for civic issue reports
//!
//! Classifies free-text descriptions into a category and routes each report
//! to the matching backend service.

use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing::{error, info};

use civic_gateway::{
    classify::classify,
    cli::{Cli, Command},
    config::Config,
    gateway::Gateway,
    issue::Priority,
    resolution::resolution_path,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    // Handle subcommands
    match cli.command {
        Some(Command::Classify { description }) => run_classify(&description),
        Some(Command::Completions { shell }) => run_completions(shell),
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Classify a description locally and print the routing decision
fn run_classify(description: &str) -> ExitCode {
    let classification = classify(description);
    let path = resolution_path(classification.category, Priority::default());

    println!("category:        {}", classification.category);
    match classification.matched_keyword {
        Some(keyword) => println!("matched_keyword: {keyword}"),
        None => println!("matched_keyword: (none, fallback)"),
    }
    println!("resolution_path: {}", path.as_str());

    ExitCode::SUCCESS
}

/// Write shell completions to stdout
fn run_completions(shell: clap_complete::Shell) -> ExitCode {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut io::stdout());
    ExitCode::SUCCESS
}

/// Run the gateway server
async fn run_server(cli: Cli) -> ExitCode {
    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        backends = config.backends.len(),
        "Starting Civic Issue Gateway"
    );

    // Create and run gateway
    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Run with graceful shutdown
    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
