//! Thoughts CLI - Capture thoughts from the terminal
//!
//! Quick capture with minimal friction; thoughts sync to one markdown file
//! per day in a GitHub repository.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use thoughts_core::services::ThoughtService;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::{open_service, resolve_db_path};
use crate::commands::config::run_config;
use crate::commands::export::run_export;
use crate::commands::flags::run_flags;
use crate::commands::geocode::run_geocode;
use crate::commands::list::run_list;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("thoughts=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path)?;

    match cli.command {
        Some(Commands::Add { text, lat, lon }) => run_add(&text, lat, lon, &db_path).await?,
        Some(Commands::List {
            limit,
            unsynced,
            json,
        }) => run_list(limit, unsynced, json, &db_path)?,
        Some(Commands::Export {
            today,
            format,
            output,
        }) => run_export(today, format, output.as_deref(), &db_path)?,
        Some(Commands::Sync { pull, push }) => run_sync(pull, push, &db_path).await?,
        Some(Commands::Status { json }) => run_status(json, &db_path)?,
        Some(Commands::Config { command }) => run_config(command, &db_path)?,
        Some(Commands::Flags { command }) => run_flags(command, &db_path)?,
        Some(Commands::Geocode { command }) => run_geocode(command, &db_path).await?,
        None => {
            // Quick capture mode: thoughts "my thought"
            if cli.thought.is_empty() {
                let service = open_service(&db_path)?;
                catch_up(&service).await;
                println!("{}", service.status_line()?);
                println!();
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.thought, None, None, &db_path).await?;
            }
        }
    }

    Ok(())
}

/// Opening the app in `auto` mode pulls today's file and flushes leftovers.
async fn catch_up(service: &ThoughtService) {
    match service.startup_sync().await {
        Ok(Some(status)) => eprintln!("{status}"),
        Ok(None) => {}
        Err(error) => tracing::warn!("Startup sync failed: {}", error),
    }
}
