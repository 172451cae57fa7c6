//! Earshot CLI entry point.

use anyhow::Result;
use clap::Parser;
use earshot::cli::{commands, Cli, Commands};
use earshot::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = match &cli.config {
        Some(path) => Settings::expand_path(path),
        None => Settings::default_config_path(),
    };
    let settings = Settings::load_from(Some(config_path.as_path()))?;

    // Initialize logging; -v overrides the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("earshot={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&config_path, &settings)?;
        }

        Commands::Import { watch, media_dir } => {
            commands::run_import(*watch, media_dir.clone(), settings).await?;
        }

        Commands::Search { query, limit } => {
            commands::run_search(query, *limit, settings).await?;
        }

        Commands::Dialog {
            media_id,
            start,
            end,
            context,
        } => {
            commands::run_dialog(media_id, *start, *end, *context, settings).await?;
        }

        Commands::Manifest => {
            commands::run_manifest(settings).await?;
        }

        Commands::Transcribe { media, output } => {
            commands::run_transcribe(media, output.clone(), settings).await?;
        }

        Commands::Meta { action } => {
            commands::run_meta(action, &settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &config_path, settings)?;
        }
    }

    Ok(())
}
