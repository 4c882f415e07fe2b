//! Speech-to-text via a local Whisper-compatible server.
//!
//! Captured samples are encoded as an in-memory WAV and posted to the
//! `/audio/transcriptions` endpoint of an OpenAI-compatible server
//! (e.g. whisper.cpp's `llama-server` or `faster-whisper-server`).

use crate::error::{Result, SvarError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, instrument};

const STT_TIMEOUT_SECS: u64 = 120;

/// Client for a local Whisper-compatible transcription server.
pub struct WhisperTranscriber {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    language: String,
}

impl WhisperTranscriber {
    /// Create a transcriber against the given API base URL
    /// (e.g. `http://localhost:8080/v1`).
    pub fn new(base_url: &str, model: &str, language: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(STT_TIMEOUT_SECS))
            .build()?;

        let config = OpenAIConfig::new()
            .with_api_base(base_url.trim_end_matches('/'))
            .with_api_key("unused");

        Ok(Self {
            client: async_openai::Client::with_config(config).with_http_client(http_client),
            model: model.to_string(),
            language: language.to_string(),
        })
    }

    /// Transcribe mono f32 samples. Returns the trimmed transcript, which
    /// is empty when the server heard nothing intelligible.
    #[instrument(skip(self, samples), fields(samples = samples.len()))]
    pub async fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String> {
        let wav_bytes = encode_wav(samples, sample_rate)?;
        debug!("Encoded {} bytes of WAV audio", wav_bytes.len());

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(
                "utterance.wav".to_string(),
                wav_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if !self.language.is_empty() {
            request_builder.language(&self.language);
        }

        let request = request_builder
            .build()
            .map_err(|e| SvarError::Transcription(format!("Invalid transcription request: {e}")))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| SvarError::Transcription(format!("Transcription failed: {e}")))?;

        Ok(response.text.trim().to_string())
    }
}

/// Encode mono f32 samples as a 16-bit PCM WAV in memory.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SvarError::Audio(format!("Failed to write WAV header: {e}")))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| SvarError::Audio(format!("Failed to write WAV sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| SvarError::Audio(format!("Failed to finalize WAV: {e}")))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_encode_wav_roundtrip() {
        let samples = vec![0.0_f32, 0.5, -0.5, 1.0, -1.0];
        let bytes = encode_wav(&samples, 16_000).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded.len(), samples.len());
        assert_eq!(decoded[0], 0);
        assert_eq!(decoded[3], i16::MAX);
        assert!((decoded[1] as f32 / i16::MAX as f32 - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_encode_wav_clamps_out_of_range() {
        let bytes = encode_wav(&[2.0, -2.0], 16_000).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded[0], i16::MAX);
        assert_eq!(decoded[1], i16::MIN + 1);
    }

    #[test]
    fn test_encode_wav_empty_input() {
        let bytes = encode_wav(&[], 16_000).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[tokio::test]
    async fn test_transcribe_returns_trimmed_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "  What is photosynthesis?  "
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transcriber = WhisperTranscriber::new(&server.uri(), "whisper-1", "en").unwrap();
        let samples = vec![0.1_f32; 1600];
        let text = transcriber.transcribe(&samples, 16_000).await.unwrap();

        assert_eq!(text, "What is photosynthesis?");
    }

    #[tokio::test]
    async fn test_transcribe_maps_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let transcriber = WhisperTranscriber::new(&server.uri(), "whisper-1", "en").unwrap();
        let err = transcriber.transcribe(&[0.1; 160], 16_000).await.unwrap_err();
        assert!(matches!(err, SvarError::Transcription(_)));
    }
}
