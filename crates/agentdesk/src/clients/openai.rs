use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::utils::{read_json, transport_error};
use crate::errors::{ServiceError, ServiceResult};

pub const LLM_TIMEOUT: Duration = Duration::from_secs(20);
pub const LLM_TEMPERATURE: f64 = 0.2;
pub const LLM_NAME: &str = "LLM";

/// Chat-completion client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    client: Client,
    host: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .map_err(|e| {
                ServiceError::not_configured(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            host: host.into(),
            model: model.into(),
        })
    }

    async fn post(&self, api_key: &str, payload: Value) -> ServiceResult<Value> {
        let url = format!("{}/v1/chat/completions", self.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(LLM_NAME, &e))?;

        read_json(LLM_NAME, response).await
    }

    /// One system + user exchange; returns the first choice's content.
    pub async fn complete(&self, api_key: &str, system: &str, user: &str) -> ServiceResult<String> {
        let payload = json!({
            "model": self.model,
            "temperature": LLM_TEMPERATURE,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ]
        });

        debug!(model = %self.model, "requesting chat completion");
        let response = self.post(api_key, payload).await?;

        first_choice_text(&response)
            .ok_or_else(|| ServiceError::upstream(format!("Unexpected response from {}", LLM_NAME)))
    }
}

fn first_choice_text(response: &Value) -> Option<String> {
    response
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|content| !content.trim().is_empty())
        .map(str::to_string)
}
