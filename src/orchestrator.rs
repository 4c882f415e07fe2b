//! Pipeline orchestrator for Svar.
//!
//! Wires settings into concrete components and coordinates the two
//! flows: ingesting documents into the vector store, and answering a
//! question (typed or spoken) against it.

use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OllamaEmbedder};
use crate::error::{Result, SvarError};
use crate::ingest::{self, TextChunker};
use crate::ollama::OllamaClient;
use crate::rag::{ContextBuilder, RagEngine, RagResponse};
use crate::speech::{
    MicCapture, Speaker, UtteranceDetector, WhisperTranscriber, CAPTURE_SAMPLE_RATE,
};
use crate::vector_store::{Document, MemoryVectorStore, SqliteVectorStore, VectorStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// The main orchestrator for the Svar pipeline.
pub struct Orchestrator {
    settings: Settings,
    client: OllamaClient,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    engine: RagEngine,
}

impl Orchestrator {
    /// Create a new orchestrator with components built from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let client = OllamaClient::with_timeout(
            &settings.ollama.base_url,
            Duration::from_secs(settings.ollama.timeout_secs),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(
            client.clone(),
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "memory" => Arc::new(MemoryVectorStore::new()),
            _ => Arc::new(SqliteVectorStore::new(&settings.database_path())?),
        };

        std::fs::create_dir_all(settings.data_dir())?;

        Ok(Self::assemble(
            settings,
            prompts,
            client,
            embedder,
            vector_store,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        client: OllamaClient,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self::assemble(settings, prompts, client, embedder, vector_store)
    }

    fn assemble(
        settings: Settings,
        prompts: Prompts,
        client: OllamaClient,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        let context_builder = ContextBuilder::new(vector_store.clone(), embedder.clone())
            .with_top_k(settings.rag.top_k)
            .with_min_score(settings.rag.min_score);

        let engine = RagEngine::new(
            client.clone(),
            &settings.llm.model,
            settings.llm.temperature,
            context_builder,
        )
        .with_prompts(prompts);

        Self {
            settings,
            client,
            embedder,
            vector_store,
            engine,
        }
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether the configured Ollama server is reachable.
    pub async fn ollama_available(&self) -> bool {
        self.client.is_available().await
    }

    /// Answer a question against the indexed documents.
    pub async fn ask(&self, question: &str) -> Result<RagResponse> {
        self.engine.ask(question).await
    }

    /// Record one utterance from the microphone and transcribe it.
    ///
    /// Returns an empty string when the listening window passes without
    /// speech. Capture runs on a blocking thread since the audio stream
    /// is not `Send`.
    pub async fn listen(&self) -> Result<String> {
        let speech = self.settings.speech.clone();

        let samples = tokio::task::spawn_blocking(move || -> Result<Vec<f32>> {
            let capture = MicCapture::new()?;
            let mut detector = UtteranceDetector::new(
                CAPTURE_SAMPLE_RATE,
                speech.energy_threshold,
                speech.silence_ms,
                speech.min_speech_ms,
            );
            capture.record_utterance(&mut detector, Duration::from_secs(speech.max_listen_secs))
        })
        .await
        .map_err(|e| SvarError::Audio(format!("Capture task failed: {e}")))??;

        if samples.is_empty() {
            return Ok(String::new());
        }

        let transcriber = WhisperTranscriber::new(
            &self.settings.speech.stt_base_url,
            &self.settings.speech.stt_model,
            &self.settings.speech.language,
        )?;
        transcriber.transcribe(&samples, CAPTURE_SAMPLE_RATE).await
    }

    /// Speak a response through the system voice.
    pub async fn speak_response(&self, text: &str) -> Result<()> {
        let speaker = Speaker::from_settings(&self.settings.speech).await?;
        if let Some(announcement) = speaker.voice_announcement() {
            info!("{}", announcement);
            eprintln!("  {}", announcement);
        }
        speaker.speak(text).await
    }

    /// Ingest a text file: chunk, embed, and index it.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_file(&self, path: &Path, force: bool) -> Result<IngestResult> {
        let source = ingest::source_label(path);
        let title = ingest::source_title(path);

        if !force && self.vector_store.is_source_indexed(&source).await? {
            info!("{} is already indexed, skipping", source);
            return Ok(IngestResult {
                source,
                title,
                chunks_indexed: 0,
                skipped: true,
            });
        }

        let content = std::fs::read_to_string(path)?;

        info!("Chunking {}", source);
        let chunker = TextChunker::new(
            self.settings.chunking.chunk_size,
            self.settings.chunking.chunk_overlap,
        );
        let chunks = chunker.chunk(&content);

        if chunks.is_empty() {
            info!("{} produced no chunks, nothing to index", source);
            return Ok(IngestResult {
                source,
                title,
                chunks_indexed: 0,
                skipped: false,
            });
        }

        info!("Embedding {} chunks", chunks.len());
        eprintln!("  Embedding {} chunks...", chunks.len());
        let embeddings = self.embedder.embed_batch(&chunks).await?;

        // Replace any previous chunks for this source before indexing.
        self.vector_store.delete_by_source(&source).await?;

        let documents: Vec<Document> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| {
                Document::new(source.clone(), title.clone(), content, embedding, i as i32)
            })
            .collect();

        let indexed = documents.len();
        self.vector_store.upsert_batch(&documents).await?;
        info!("Indexed {} chunks from {}", indexed, source);

        Ok(IngestResult {
            source,
            title,
            chunks_indexed: indexed,
            skipped: false,
        })
    }
}

/// Result of ingesting one file.
#[derive(Debug)]
pub struct IngestResult {
    pub source: String,
    pub title: String,
    pub chunks_indexed: usize,
    pub skipped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_orchestrator(base_url: &str) -> Orchestrator {
        let mut settings = Settings::default();
        settings.ollama.base_url = base_url.to_string();
        settings.vector_store.provider = "memory".to_string();

        let client = OllamaClient::new(base_url).unwrap();
        let embedder: Arc<dyn Embedder> =
            Arc::new(OllamaEmbedder::new(client.clone(), "nomic-embed-text", 3));
        let vector_store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());

        Orchestrator::with_components(settings, Prompts::default(), client, embedder, vector_store)
    }

    #[tokio::test]
    async fn test_ask_uses_indexed_documents() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.1, 0.2, 0.3]})),
            )
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Photosynthesis converts light into chemical energy."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("biology.md");
        std::fs::write(
            &file,
            "Photosynthesis converts light energy into chemical energy inside plant cells.",
        )
        .unwrap();

        let orchestrator = test_orchestrator(&server.uri());
        orchestrator.ingest_file(&file, false).await.unwrap();

        let response = orchestrator.ask("What is photosynthesis?").await.unwrap();

        assert_eq!(
            response.answer,
            "Photosynthesis converts light into chemical energy."
        );
        let refs: Vec<String> = response.sources.iter().map(|s| s.source_ref.clone()).collect();
        assert_eq!(refs, vec![format!("{}:0", file.display())]);
    }

    #[tokio::test]
    async fn test_ingest_file_skips_then_reindexes_with_force() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.1, 0.2, 0.3]})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.md");
        std::fs::write(
            &file,
            "Photosynthesis converts light energy into chemical energy inside plant cells.",
        )
        .unwrap();

        let orchestrator = test_orchestrator(&server.uri());

        let first = orchestrator.ingest_file(&file, false).await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.chunks_indexed, 1);

        let second = orchestrator.ingest_file(&file, false).await.unwrap();
        assert!(second.skipped);
        assert_eq!(second.chunks_indexed, 0);

        let forced = orchestrator.ingest_file(&file, true).await.unwrap();
        assert!(!forced.skipped);
        assert_eq!(forced.chunks_indexed, 1);

        assert_eq!(
            orchestrator
                .vector_store()
                .document_count()
                .await
                .unwrap(),
            1
        );
    }
}
