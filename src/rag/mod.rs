//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Provides the ability to ask questions and get answers from the document library.

pub mod context;
mod response;

pub use context::{ContextBuilder, CONTEXT_SEPARATOR};
pub use response::{RagEngine, RagResponse};

use crate::vector_store::SearchResult;

/// A retrieved chunk ready for prompt assembly and citation.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Source path or label.
    pub source: String,
    /// Display title of the source.
    pub title: String,
    /// Citation identifier (e.g. `notes/biology.md:4`).
    pub source_ref: String,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            source: result.document.source.clone(),
            title: result.document.title.clone(),
            source_ref: result.document.source_ref(),
            content: result.document.content.clone(),
            score: result.score,
        }
    }
}
