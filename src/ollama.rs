//! Client for the local Ollama HTTP API.
//!
//! Covers the three endpoints Svar uses: `/api/generate` for answers,
//! `/api/embeddings` for query and chunk vectors, and `/api/tags` as a
//! reachability probe. Requests are made once; there is no retry path.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SvarError};

/// Default timeout for Ollama requests (5 minutes; generation on CPU is slow).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// HTTP client bound to one Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a client with the default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The server base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a single non-streaming completion and return the generated text.
    pub async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };

        debug!(model, prompt_chars = prompt.len(), "requesting generation");

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SvarError::Ollama(format!(
                "generate returned {}: {}",
                status, body
            )));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }

    /// Embed a single text and return its vector.
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingsRequest {
            model,
            prompt: text,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SvarError::Ollama(format!(
                "embeddings returned {}: {}",
                status, body
            )));
        }

        let body: EmbeddingsResponse = response.json().await?;

        if body.embedding.is_empty() {
            return Err(SvarError::Ollama(format!(
                "model '{}' returned an empty embedding",
                model
            )));
        }

        Ok(body.embedding)
    }

    /// Check whether the server answers at all.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// List the model names the server has pulled.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(SvarError::Ollama(format!(
                "tags returned {}",
                response.status()
            )));
        }

        let body: TagsResponse = response.json().await?;
        Ok(body.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_returns_response_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2",
                "stream": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Photosynthesis converts light into sugar.",
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri()).unwrap();
        let answer = client
            .generate("llama3.2", "What is photosynthesis?", 0.7)
            .await
            .unwrap();

        assert_eq!(answer, "Photosynthesis converts light into sugar.");
    }

    #[tokio::test]
    async fn test_generate_maps_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string("model 'missing' not found"),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri()).unwrap();
        let err = client.generate("missing", "hi", 0.7).await.unwrap_err();

        match err {
            SvarError::Ollama(msg) => assert!(msg.contains("404")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.1, 0.2, 0.3],
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri()).unwrap();
        let embedding = client.embed("nomic-embed-text", "hello").await.unwrap();

        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_rejects_empty_embedding() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [],
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri()).unwrap();
        let result = client.embed("nomic-embed-text", "hello").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_is_available() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [],
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri()).unwrap();
        assert!(client.is_available().await);

        let unreachable = OllamaClient::new("http://127.0.0.1:1").unwrap();
        assert!(!unreachable.is_available().await);
    }

    #[tokio::test]
    async fn test_list_models_parses_tags() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    {"name": "llama3.2:latest"},
                    {"name": "nomic-embed-text:latest"},
                ],
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri()).unwrap();
        let models = client.list_models().await.unwrap();

        assert_eq!(models, vec!["llama3.2:latest", "nomic-embed-text:latest"]);
    }
}
