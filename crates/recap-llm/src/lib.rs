use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("summarizer request failed: {0}")]
    Transport(String),
    #[error("summarizer returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("summarizer response missing text")]
    EmptyResponse,
}

/// External text-generation collaborator. One prompt in, one summary out;
/// a single best-effort call with no retry policy.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError>;
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
        let endpoint = format!("{API_BASE}/models/{}:generateContent", self.model);

        let payload = json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        });

        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting summary");

        let response = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SummarizerError::Transport(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SummarizerError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(SummarizerError::Api {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }

        body.get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(ToString::to_string)
            .ok_or(SummarizerError::EmptyResponse)
    }
}
