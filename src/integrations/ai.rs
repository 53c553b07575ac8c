// Chat-completion client for an OpenAI-compatible AI gateway.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::http::{FetchError, HttpClient};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI gateway request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("AI gateway returned no content")]
    EmptyResponse,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AiClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl AiClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one system and one user message; returns the first choice's text, trimmed
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.4
        });

        let response: CompletionResponse = self
            .http
            .fetch_json(|c| {
                let request = c.post(&url).json(&body);
                match &self.api_key {
                    Some(key) => request.bearer_auth(key),
                    None => request,
                }
            })
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AiError::EmptyResponse)?;

        debug!(chars = content.len(), "AI completion received");
        Ok(content)
    }
}
