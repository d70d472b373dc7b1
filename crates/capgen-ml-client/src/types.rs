//! Wire types for the speech and chat endpoints.

use serde::{Deserialize, Serialize};

/// A transcription segment with timing.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSegment {
    /// Segment start, seconds
    pub start: f64,
    /// Segment end, seconds
    pub end: f64,
    pub text: String,
}

/// `verbose_json` transcription/translation response.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
}

impl TranscriptionResponse {
    /// Format as `[M:SS - M:SS] -> text` lines, one per segment, falling
    /// back to the flat text when no segments were returned.
    pub fn formatted(&self) -> String {
        if self.segments.is_empty() {
            return self.text.trim().to_string();
        }

        self.segments
            .iter()
            .map(|s| {
                format!(
                    "[{} - {}] -> {}",
                    format_timestamp(s.start),
                    format_timestamp(s.end),
                    s.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Format seconds as `M:SS`.
fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// A chat message. `content` is either a plain string or, for image
/// inputs, an array of content parts. Both are valid JSON here.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: serde_json::Value,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: serde_json::Value::String(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: serde_json::Value::String(text.into()),
        }
    }

    /// User message carrying a prompt plus an inline base64 image.
    pub fn user_with_image(text: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: serde_json::json!([
                { "type": "text", "text": text.into() },
                { "type": "image_url", "image_url": { "url": data_url.into() } }
            ]),
        }
    }
}

/// Chat completion response (the parts we read).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseMessage {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_with_segments() {
        let response = TranscriptionResponse {
            text: "hello world".to_string(),
            segments: vec![
                TranscriptionSegment {
                    start: 0.0,
                    end: 5.4,
                    text: " hello ".to_string(),
                },
                TranscriptionSegment {
                    start: 65.0,
                    end: 70.0,
                    text: "world".to_string(),
                },
            ],
        };

        assert_eq!(
            response.formatted(),
            "[0:00 - 0:05] -> hello\n[1:05 - 1:10] -> world"
        );
    }

    #[test]
    fn test_formatted_without_segments() {
        let response = TranscriptionResponse {
            text: " flat text \n".to_string(),
            segments: Vec::new(),
        };
        assert_eq!(response.formatted(), "flat text");
    }
}
