//! Toolkit CLI
//!
//! Inspect the profiles the toolkit can see and resolve credentials for one
//! of them from a terminal.
//!
//! ```bash
//! toolkit profiles
//! toolkit resolve dev
//! RUST_LOG=debug toolkit resolve dev --json
//! ```

mod args;
mod challenge;
mod commands;
mod console;

use args::{Cli, Commands};
use challenge::TerminalChallengeHandler;
use clap::Parser;
use console::CliConsole;
use std::sync::Arc;
use toolkit_core::{ToolkitContext, load_config};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    // RUST_LOG wins; --verbose only changes the fallback
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, console: &CliConsole) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    if let Commands::Config = cli.command {
        return commands::config::show(&config, console);
    }

    let context = ToolkitContext::builder(config)
        .with_challenge_handler(Arc::new(TerminalChallengeHandler))
        .without_background_tasks()
        .build()?;

    let result = match &cli.command {
        Commands::Profiles => {
            commands::profiles::list(&context, console);
            Ok(())
        }
        Commands::Resolve { profile, json } => {
            commands::resolve::run(&context, console, profile, *json).await
        }
        Commands::Config => Ok(()),
    };

    context.shutdown().await;
    result
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let console = CliConsole::new(cli.verbose);

    if let Err(e) = run(cli, &console).await {
        console.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
