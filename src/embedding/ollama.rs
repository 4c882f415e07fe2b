//! Ollama embeddings implementation.

use super::Embedder;
use crate::error::Result;
use crate::ollama::OllamaClient;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Embedder backed by a local Ollama server.
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create an embedder for the given model.
    pub fn new(client: OllamaClient, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        // The embeddings endpoint takes one prompt per request, so a batch
        // is a sequential series of calls.
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            all_embeddings.push(self.client.embed(&self.model, text).await?);
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_embedder_creation() {
        let client = OllamaClient::new("http://localhost:11434").unwrap();
        let embedder = OllamaEmbedder::new(client, "nomic-embed-text", 768);
        assert_eq!(embedder.dimensions(), 768);
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(serde_json::json!({"prompt": "first"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [1.0, 0.0],
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(serde_json::json!({"prompt": "second"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.0, 1.0],
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri()).unwrap();
        let embedder = OllamaEmbedder::new(client, "nomic-embed-text", 2);

        let embeddings = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_embed_batch_empty_input() {
        let client = OllamaClient::new("http://localhost:11434").unwrap();
        let embedder = OllamaEmbedder::new(client, "nomic-embed-text", 768);

        let embeddings = embedder.embed_batch(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
