//! storybridge-migrate - Airtable to platform store migration
//!
//! Runs one migration and exits. Configuration comes from `STORYBRIDGE_*`
//! environment variables, falling back to the TOML config file; there are
//! no command-line flags.
//!
//! Exit status is 0 when the run reaches COMPLETED (per-record errors
//! included) and 1 when it FAILED or could not start.

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use storybridge_common::config::MigrationConfig;
use storybridge_migrate::source::AirtableSource;
use storybridge_migrate::target::SqliteTarget;
use storybridge_migrate::orchestrator::ConsoleCapture;
use storybridge_migrate::Orchestrator;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = MigrationConfig::resolve().context("Failed to resolve configuration")?;

    // RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    // Everything the console shows is also captured for the run log artifact
    let console = ConsoleCapture::new();
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(console.clone())
        .init();

    info!("Starting storybridge-migrate");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Source: Airtable base {} at {}", config.source_base_id, config.source_api_url);
    info!("Log directory: {}", config.log_dir.display());

    let source = AirtableSource::new(
        config.source_api_url.as_str(),
        config.source_base_id.as_str(),
        config.source_api_key.as_str(),
    )
    .context("Failed to initialize Airtable client")?;

    let target = SqliteTarget::connect(&config.database_url, config.lock_wait_ms)
        .await
        .context("Failed to connect to target database")?;
    info!("Target database connection established");

    let orchestrator = Orchestrator::new(Arc::new(source), Arc::new(target), config.log_dir.clone())
        .with_console_capture(console);
    let report = orchestrator.run().await;

    // The run log already carries the summary and artifact paths
    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
