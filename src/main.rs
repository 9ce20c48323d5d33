//! Booktrack CLI
//!
//! Command-line interface for the booktrack assembly pipeline.

use anyhow::Context;
use clap::Parser;
use log::info;
use tracing_subscriber::EnvFilter;

use booktrack::cli::{commands, Cli, Commands};
use booktrack::BooktrackError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger; also routes `log` records into tracing
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    info!("Booktrack v{}", env!("CARGO_PKG_VERSION"));

    let Some(command) = cli.command.as_ref() else {
        println!("Booktrack v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for available commands");
        return Ok(());
    };

    let config = cli
        .resolve_config()
        .context("Failed to resolve configuration")?;

    if let Err(e) = handle_command(command, &cli, &config) {
        print_suggestions(&e);
        let code = e.error_code();
        return Err(e).context(format!("[{}]", code));
    }
    Ok(())
}

fn handle_command(
    command: &Commands,
    cli: &Cli,
    config: &booktrack::config::TrackConfig,
) -> booktrack::Result<()> {
    match command {
        Commands::Fetch { index, locator } => commands::fetch(config, cli.session, *index, locator),
        Commands::Assemble { indices } => commands::assemble(config, cli.session, indices),
        Commands::Stitch { locators } => commands::stitch(config, locators),
        Commands::CheckCodec => commands::check_codec(config),
        Commands::List => commands::list(config, cli.session),
    }
}

fn print_suggestions(error: &BooktrackError) {
    let suggestions = error.recovery_suggestions();
    if suggestions.is_empty() {
        return;
    }
    eprintln!("Suggestions:");
    for suggestion in suggestions {
        eprintln!("  - {}", suggestion);
    }
}
