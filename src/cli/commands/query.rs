//! Query commands: typed and spoken questions.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::RagResponse;
use anyhow::Result;
use tracing::warn;

/// Answer a question typed on the command line.
pub async fn run_query(question: &str, settings: Settings) -> Result<()> {
    let orchestrator = connect(settings).await?;
    let response = answer(&orchestrator, question).await?;

    if orchestrator.settings().speech.speak_responses {
        speak_answer(&orchestrator, &response.answer).await;
    }

    Ok(())
}

/// Listen for a spoken question, answer it, and speak the response.
pub async fn run_voice_query(settings: Settings) -> Result<()> {
    let orchestrator = connect(settings).await?;

    Output::info("Listening for your question...");
    let transcript = orchestrator.listen().await?;

    respond_to_transcript(&orchestrator, &transcript).await
}

/// Everything after the microphone: an empty transcript prints a notice
/// and stops before any model call.
pub(crate) async fn respond_to_transcript(
    orchestrator: &Orchestrator,
    transcript: &str,
) -> Result<()> {
    let question = transcript.trim();
    if question.is_empty() {
        Output::warning("No speech detected");
        return Ok(());
    }

    Output::info(&format!("You asked: {}", question));
    let response = answer(orchestrator, question).await?;

    if orchestrator.settings().speech.speak_responses {
        speak_answer(orchestrator, &response.answer).await;
    }

    Ok(())
}

/// Create the orchestrator and make sure Ollama is reachable.
async fn connect(settings: Settings) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::new(settings)?;

    if !orchestrator.ollama_available().await {
        Output::error(&format!(
            "Cannot reach Ollama at {}",
            orchestrator.settings().ollama.base_url
        ));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        anyhow::bail!("Ollama is not reachable");
    }

    Ok(orchestrator)
}

/// Run the question through retrieval and generation, print the result.
async fn answer(orchestrator: &Orchestrator, question: &str) -> Result<RagResponse> {
    Output::info(&format!("Processing: {}", question));

    let spinner = Output::spinner("Thinking...");
    match orchestrator.ask(question).await {
        Ok(response) => {
            spinner.finish_and_clear();
            println!("{}", response.format_for_display());
            Ok(response)
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}

/// Speak the answer aloud. Speech failures are reported but never fatal.
async fn speak_answer(orchestrator: &Orchestrator, text: &str) {
    Output::info("Speaking response...");
    match orchestrator.speak_response(text).await {
        Ok(()) => Output::success("Finished speaking"),
        Err(e) => {
            warn!("Speech output failed: {}", e);
            Output::warning(&format!("Speech output failed: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::embedding::{Embedder, OllamaEmbedder};
    use crate::ollama::OllamaClient;
    use crate::vector_store::{MemoryVectorStore, VectorStore};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_orchestrator(base_url: &str, speak: bool) -> Orchestrator {
        let mut settings = Settings::default();
        settings.ollama.base_url = base_url.to_string();
        settings.vector_store.provider = "memory".to_string();
        settings.speech.speak_responses = speak;

        let client = OllamaClient::new(base_url).unwrap();
        let embedder: Arc<dyn Embedder> =
            Arc::new(OllamaEmbedder::new(client.clone(), "nomic-embed-text", 3));
        let vector_store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());

        Orchestrator::with_components(settings, Prompts::default(), client, embedder, vector_store)
    }

    #[tokio::test]
    async fn test_empty_transcript_never_reaches_the_model() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.1, 0.2, 0.3]})),
            )
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "hi"})))
            .expect(0)
            .mount(&server)
            .await;

        let orchestrator = test_orchestrator(&server.uri(), false);

        respond_to_transcript(&orchestrator, "").await.unwrap();
        respond_to_transcript(&orchestrator, "   \n\t  ").await.unwrap();
    }

    #[tokio::test]
    async fn test_transcript_with_words_runs_the_query() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.1, 0.2, 0.3]})),
            )
            .expect(1)
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

        let orchestrator = test_orchestrator(&server.uri(), false);

        respond_to_transcript(&orchestrator, "  What is photosynthesis?  ")
            .await
            .unwrap();
    }
}
