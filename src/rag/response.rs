//! RAG response generation.

use super::context::{format_context_for_display, format_context_for_prompt};
use super::{ContextBuilder, ContextChunk};
use crate::config::Prompts;
use crate::error::Result;
use crate::ollama::OllamaClient;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// RAG engine for question answering.
pub struct RagEngine {
    client: OllamaClient,
    model: String,
    temperature: f32,
    context_builder: ContextBuilder,
    prompts: Prompts,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(
        client: OllamaClient,
        model: &str,
        temperature: f32,
        context_builder: ContextBuilder,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
            context_builder,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Render the full prompt for a question and its retrieved context.
    ///
    /// An empty chunk list produces an empty context block; the question is
    /// substituted either way.
    pub fn render_prompt(&self, question: &str, chunks: &[ContextChunk]) -> String {
        let context_text = format_context_for_prompt(chunks);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context_text);

        Prompts::render(&self.prompts.query.template, &vars)
    }

    /// Ask a single question and get a response.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn ask(&self, question: &str) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        // Retrieve context from the library
        let context_chunks = self.context_builder.build(question).await?;
        if !context_chunks.is_empty() {
            debug!(
                "Retrieved context:\n{}",
                format_context_for_display(&context_chunks)
            );
        }

        // Assemble the prompt and run a single generation
        let prompt = self.render_prompt(question, &context_chunks);
        let answer = self
            .client
            .generate(&self.model, &prompt, self.temperature)
            .await?;

        debug!("Generated response with {} sources", context_chunks.len());

        Ok(RagResponse {
            answer,
            sources: context_chunks,
        })
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Source chunks used for the answer.
    pub sources: Vec<ContextChunk>,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let refs: Vec<&str> = self.sources.iter().map(|s| s.source_ref.as_str()).collect();
        format!("Response: {}\nSources: [{}]", self.answer, refs.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::vector_store::{Document, MemoryVectorStore, VectorStore};
    use async_trait::async_trait;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> crate::error::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn chunk(content: &str) -> ContextChunk {
        ContextChunk {
            source: "doc.md".to_string(),
            title: "doc".to_string(),
            source_ref: "doc.md:0".to_string(),
            content: content.to_string(),
            score: 1.0,
        }
    }

    fn engine_for(server_url: &str, store: Arc<dyn VectorStore>) -> RagEngine {
        let client = OllamaClient::new(server_url).unwrap();
        let builder = ContextBuilder::new(store, Arc::new(FixedEmbedder));
        RagEngine::new(client, "llama3.2", 0.7, builder)
    }

    #[test]
    fn test_prompt_contains_question_and_all_contents() {
        let engine = engine_for("http://localhost:11434", Arc::new(MemoryVectorStore::new()));

        let chunks = vec![chunk("Chlorophyll absorbs light."), chunk("Plants fix carbon."), chunk("Oxygen is released.")];
        let prompt = engine.render_prompt("What is photosynthesis?", &chunks);

        assert!(prompt.contains("What is photosynthesis?"));
        assert!(prompt.contains(
            "Chlorophyll absorbs light.\n\n---\n\nPlants fix carbon.\n\n---\n\nOxygen is released."
        ));
    }

    #[test]
    fn test_prompt_with_zero_documents_still_substitutes_question() {
        let engine = engine_for("http://localhost:11434", Arc::new(MemoryVectorStore::new()));

        let prompt = engine.render_prompt("What is photosynthesis?", &[]);

        assert!(prompt.contains("Answer the question based only on the following context:"));
        assert!(prompt
            .ends_with("Answer the question based on the above context: What is photosynthesis?"));
        assert!(!prompt.contains("{{context}}"));
    }

    #[tokio::test]
    async fn test_ask_sends_assembled_prompt_and_collects_sources() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Light becomes sugar.",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(&Document::new(
                "bio.md".to_string(),
                "bio".to_string(),
                "Photosynthesis converts light into chemical energy.".to_string(),
                vec![1.0, 0.0],
                0,
            ))
            .await
            .unwrap();

        let engine = engine_for(&server.uri(), store);
        let response = engine.ask("What is photosynthesis?").await.unwrap();

        assert_eq!(response.answer, "Light becomes sugar.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].source_ref, "bio.md:0");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.contains("What is photosynthesis?"));
        assert!(prompt.contains("Photosynthesis converts light into chemical energy."));
    }

    #[tokio::test]
    async fn test_ask_with_empty_store_still_calls_model() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "I don't have enough context to answer that.",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server.uri(), Arc::new(MemoryVectorStore::new()));
        let response = engine.ask("What is photosynthesis?").await.unwrap();

        assert!(response.sources.is_empty());
        assert_eq!(
            response.format_for_display(),
            "Response: I don't have enough context to answer that.\nSources: []"
        );
    }

    #[test]
    fn test_format_for_display_lists_source_refs() {
        let response = RagResponse {
            answer: "Answer text".to_string(),
            sources: vec![chunk("a"), chunk("b")],
        };

        assert_eq!(
            response.format_for_display(),
            "Response: Answer text\nSources: [doc.md:0, doc.md:0]"
        );
    }
}
