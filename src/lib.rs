//! Svar - Voice-enabled document Q&A
//!
//! A local-first CLI that answers questions from your own documents,
//! spoken or typed, through a local Ollama model.
//!
//! The name "Svar" comes from the Norwegian word for "answer."
//!
//! # Overview
//!
//! Svar allows you to:
//! - Index Markdown and plain-text documents into a local vector store
//! - Ask questions from the command line and get answers with citations
//! - Ask by voice: capture the question from the microphone, transcribe
//!   it, and hear the answer spoken back
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `ollama` - Client for the local Ollama HTTP API
//! - `ingest` - Text file discovery and chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `rag` - RAG engine for question answering
//! - `speech` - Microphone capture, transcription, and synthesis
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use svar::config::Settings;
//! use svar::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     // Index a document, then ask about it
//!     let result = orchestrator.ingest_file("notes/biology.md".as_ref(), false).await?;
//!     println!("Indexed {} chunks", result.chunks_indexed);
//!
//!     let response = orchestrator.ask("What is photosynthesis?").await?;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod ollama;
pub mod orchestrator;
pub mod rag;
pub mod speech;
pub mod vector_store;

pub use error::{Result, SvarError};
