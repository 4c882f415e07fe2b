//! CLI module for Svar.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Svar - Ask your documents, by voice or keyboard
///
/// A local-first CLI that answers questions from your indexed documents
/// through a local Ollama model. The name "Svar" comes from the
/// Norwegian word for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The question to ask (omit it and pass --voice to speak instead)
    pub query_text: Option<String>,

    /// Ask the question by voice through the microphone
    #[arg(long)]
    pub voice: bool,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index text documents so they can be queried
    Ingest {
        /// Files or directories to index (.md, .markdown, .txt)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Force re-indexing even if already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// List indexed sources
    Sources,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
