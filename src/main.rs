//! # wp_actualites
//!
//! Migrates "actualités" (news posts) from a legacy WordPress site to a new
//! one through the WordPress REST API.
//!
//! ## Features
//!
//! - Batched, resumable export of the legacy actualités to a JSON file
//! - Recovery of article bodies from the public pages when the API has none
//!   (see [`extract`])
//! - Import into the new site with an application password, including ACF
//!   fields
//! - Clean-up of imported posts, and diagnostics for connection, credentials,
//!   ACF layout and extraction
//!
//! ## Usage
//!
//! ```sh
//! wp_actualites export
//! wp_actualites --username admin --app-password "abcd efgh ijkl mnop" import
//! ```
//!
//! ## Architecture
//!
//! 1. **Export**: list the legacy actualités page by page, fetch each record,
//!    scrape the body from the public page if needed, write the export file
//! 2. **Import**: verify credentials, detect the destination post type,
//!    create every exported post, push ACF fields
//! 3. **Clean**: delete what the import created

use clap::Parser;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod extract;
mod models;
mod outputs;
mod tasks;
mod utils;
mod wordpress;

use cli::{Cli, Command};
use config::Settings;
use tasks::browse::{self, Listing};
use tasks::clean::{CleanOptions, clean};
use tasks::diagnose;
use tasks::export::{ExportOptions, export_all};
use tasks::import::{ImportOptions, import_all};
use wordpress::WpClient;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    // Parse CLI
    let args = Cli::parse();
    debug!(command = ?args.command, config = ?args.global.config, "Parsed CLI arguments");

    let settings = Settings::load(args.global.config.as_deref())?.with_overrides(args.overrides());
    info!(
        source = %settings.source_url,
        target = %settings.target_url,
        export_file = %settings.export_file.display(),
        "wp_actualites starting up"
    );

    run(args.command, &settings).await?;

    info!(elapsed_ms = start_time.elapsed().as_millis(), "Done");
    Ok(())
}

/// Dispatch one subcommand.
async fn run(command: Command, settings: &Settings) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Export { .. } => {
            let source = WpClient::new(&settings.source_url)?;
            export_all(&source, &ExportOptions::from_settings(settings)).await?;
        }
        Command::Import => {
            let target = authenticated_target(settings)?;
            let summary = import_all(&target, &ImportOptions::from_settings(settings)).await?;
            if !summary.is_clean() {
                warn!(%summary, "Some posts were not imported");
            }
        }
        Command::Clean { all } => {
            let target = authenticated_target(settings)?;
            let summary = clean(&target, &CleanOptions::from_settings(settings, all)).await?;
            if !summary.is_clean() {
                warn!(%summary, "Some posts were not deleted");
            }
        }
        Command::TestConnection => {
            diagnose::test_connection(&WpClient::new(&settings.source_url)?).await?;
        }
        Command::TestAuth => {
            diagnose::test_auth(&authenticated_target(settings)?).await?;
        }
        Command::CheckAcf => {
            diagnose::check_acf(&WpClient::new(&settings.source_url)?).await?;
        }
        Command::Probe { url, title } => {
            diagnose::probe(&WpClient::new(&settings.source_url)?, &url, &title).await?;
        }
        Command::List {
            limit,
            category,
            actualites,
        } => {
            let listing = if actualites {
                Listing::Actualites
            } else {
                Listing::Posts { category }
            };
            browse::list(&WpClient::new(&settings.source_url)?, listing, limit).await;
        }
        Command::Show { slug, actualite } => {
            browse::show(&WpClient::new(&settings.source_url)?, &slug, actualite).await?;
        }
        Command::Catalog => {
            browse::catalog(&WpClient::new(&settings.source_url)?).await;
        }
    }
    Ok(())
}

fn authenticated_target(settings: &Settings) -> Result<WpClient, Box<dyn Error>> {
    let credentials = settings.credentials()?;
    debug!(?credentials, "Using credentials for the new site");
    Ok(WpClient::new(&settings.target_url)?.with_credentials(credentials))
}
