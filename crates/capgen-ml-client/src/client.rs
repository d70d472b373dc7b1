//! Speech/LLM service HTTP client.

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info, warn};

use capgen_models::{GeneratedContent, GenerationParams};

use crate::error::{MlError, MlResult};
use crate::prompt::{
    build_image_prompt, build_transcript_prompt, parse_generated_content, SYSTEM_PROMPT,
};
use crate::types::{ChatMessage, ChatRequest, ChatResponse, TranscriptionResponse};

/// Configuration for the ML client.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// API base URL (OpenAI-compatible)
    pub base_url: String,
    /// Bearer API key
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for retryable failures
    pub max_retries: u32,
    /// Speech-to-text model
    pub transcription_model: String,
    /// Content generation model
    pub chat_model: String,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(300), // transcription of long uploads is slow
            max_retries: 2,
            transcription_model: "whisper-1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(
                std::env::var("ML_REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_retries: std::env::var("ML_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            transcription_model: std::env::var("ML_TRANSCRIPTION_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string()),
            chat_model: std::env::var("ML_CHAT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}

/// Client for the speech-to-text and language-model API.
pub struct MlClient {
    http: Client,
    config: MlClientConfig,
}

impl MlClient {
    /// Create a new client.
    pub fn new(config: MlClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(MlClientConfig::from_env())
    }

    /// Transcribe (or translate to English) an audio file.
    ///
    /// Returns the segment-formatted transcript (`[M:SS - M:SS] -> text`).
    pub async fn transcribe(
        &self,
        audio_path: impl AsRef<Path>,
        language: Option<&str>,
        translate_to_english: bool,
    ) -> MlResult<String> {
        let audio_path = audio_path.as_ref();
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let endpoint = if translate_to_english {
            "audio/translations"
        } else {
            "audio/transcriptions"
        };
        let url = format!("{}/{}", self.config.base_url, endpoint);

        debug!(url = %url, file = %file_name, "Sending transcription request");

        let response = self
            .with_retry(|| async {
                // The form is not reusable across attempts, rebuild it
                let mut form = Form::new()
                    .part("file", Part::bytes(bytes.clone()).file_name(file_name.clone()))
                    .text("model", self.config.transcription_model.clone())
                    .text("response_format", "verbose_json");

                // The translation endpoint infers the source language
                if !translate_to_english {
                    if let Some(lang) = language {
                        form = form.text("language", lang.to_string());
                    }
                }

                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .multipart(form)
                    .send()
                    .await
                    .map_err(MlError::Network)?;

                Self::check_status(response).await
            })
            .await?;

        let transcription: TranscriptionResponse =
            response.json().await.map_err(MlError::Network)?;

        info!(segments = transcription.segments.len(), "Transcription complete");
        Ok(transcription.formatted())
    }

    /// Generate the content payload from a transcript.
    pub async fn generate_from_transcript(
        &self,
        transcription: &str,
        params: &GenerationParams,
    ) -> MlResult<GeneratedContent> {
        let prompt = build_transcript_prompt(transcription, params);
        let content = self
            .chat_completion(vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ])
            .await?;

        Ok(parse_generated_content(transcription, &content))
    }

    /// Generate the content payload from an image, sent inline as base64.
    pub async fn generate_from_image(
        &self,
        image_path: impl AsRef<Path>,
        params: &GenerationParams,
    ) -> MlResult<GeneratedContent> {
        let image_path = image_path.as_ref();
        let bytes = tokio::fs::read(image_path).await?;
        let mime = image_mime(image_path);
        let data_url = format!(
            "data:{};base64,{}",
            mime,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );

        let prompt = build_image_prompt(params);
        let content = self
            .chat_completion(vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user_with_image(prompt, data_url),
            ])
            .await?;

        // No transcript exists for image inputs
        Ok(parse_generated_content("", &content))
    }

    /// Run a chat completion and return the first choice's content.
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> MlResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: self.config.chat_model.clone(),
            messages,
            temperature: 0.7,
            max_tokens: 1000,
        };

        debug!(url = %url, model = %request.model, "Sending chat completion request");

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(MlError::Network)?;

                Self::check_status(response).await
            })
            .await?;

        let chat: ChatResponse = response.json().await.map_err(MlError::Network)?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MlError::parse("Chat response contained no choices"))
    }

    /// Convert non-success responses into API errors with the body text.
    async fn check_status(response: reqwest::Response) -> MlResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MlError::api(status.as_u16(), body))
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "ML request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| MlError::parse("Retry loop exhausted without error")))
    }
}

/// Guess the MIME type for an image upload from its extension.
fn image_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> MlClientConfig {
        MlClientConfig {
            base_url,
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = MlClientConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.transcription_model, "whisper-1");
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("a.png")), "image/png");
        assert_eq!(image_mime(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(image_mime(Path::new("noext")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_transcribe_formats_segments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/translations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "text": "hello world",
                "segments": [
                    { "start": 0.0, "end": 4.2, "text": " hello" },
                    { "start": 4.2, "end": 8.0, "text": " world" }
                ]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("clip.mp3");
        std::fs::write(&audio, b"fake audio").unwrap();

        let client = MlClient::new(test_config(server.uri())).unwrap();
        let transcript = client.transcribe(&audio, None, true).await.unwrap();

        assert_eq!(transcript, "[0:00 - 0:04] -> hello\n[0:04 - 0:08] -> world");
    }

    #[tokio::test]
    async fn test_generate_parses_sections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "CAPTION:\nBig news! 🚀\n\nDESCRIPTION:\nAll the details.\n\nHASHTAGS:\n#news #launch"
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = MlClient::new(test_config(server.uri())).unwrap();
        let content = client
            .generate_from_transcript("[0:00 - 0:02] -> big news", &GenerationParams::default())
            .await
            .unwrap();

        assert_eq!(content.caption, "Big news! 🚀");
        assert_eq!(content.description, "All the details.");
        assert_eq!(content.youtube.tags, vec!["news", "launch"]);
        assert_eq!(content.transcription, "[0:00 - 0:02] -> big news");
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
            .mount(&server)
            .await;

        let client = MlClient::new(test_config(server.uri())).unwrap();
        let err = client
            .generate_from_transcript("t", &GenerationParams::default())
            .await
            .unwrap_err();

        match err {
            MlError::Api { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad model");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
