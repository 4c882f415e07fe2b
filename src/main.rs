//! Svar CLI entry point.

use anyhow::Result;
use clap::Parser;
use svar::cli::{commands, Cli, Commands};
use svar::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("svar={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Some(Commands::Ingest { paths, force }) => {
            commands::run_ingest(paths, *force, settings).await?;
        }

        Some(Commands::Sources) => {
            commands::run_sources(settings).await?;
        }

        Some(Commands::Doctor) => {
            commands::run_doctor(&settings).await?;
        }

        Some(Commands::Config { action }) => {
            commands::run_config(action, settings)?;
        }

        None => {
            if cli.voice {
                commands::run_voice_query(settings).await?;
            } else if let Some(question) = &cli.query_text {
                commands::run_query(question, settings).await?;
            } else {
                print_usage_hint();
            }
        }
    }

    Ok(())
}

/// Bare invocation: point at the two ways to ask a question.
fn print_usage_hint() {
    println!("Usage:");
    println!("  svar --voice              Ask your question by voice");
    println!("  svar \"your question\"      Ask from the command line");
}
