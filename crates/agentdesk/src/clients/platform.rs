use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::utils::{read_json, transport_error};
use crate::errors::{ServiceError, ServiceResult};

pub const PLATFORM_TIMEOUT: Duration = Duration::from_secs(10);
pub const PLATFORM_NAME: &str = "ElevenLabs";

/// JSON client for the platform's agent configuration endpoints.
pub struct PlatformClient {
    client: Client,
    base_url: String,
}

impl PlatformClient {
    pub fn new(base_url: impl Into<String>) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(PLATFORM_TIMEOUT)
            .build()
            .map_err(|e| {
                ServiceError::not_configured(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn agent_url(&self, agent_id: &str) -> ServiceResult<Url> {
        let invalid = || {
            ServiceError::not_configured(format!(
                "ELEVENLABS_BASE_URL is not a valid URL: {}",
                self.base_url
            ))
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["v1", "convai", "agents", agent_id]);
        Ok(url)
    }

    pub async fn get_agent(&self, api_key: &str, agent_id: &str) -> ServiceResult<Value> {
        let url = self.agent_url(agent_id)?;
        debug!(agent_id, "fetching agent configuration");
        self.send(self.client.get(url), api_key).await
    }

    pub async fn patch_agent(
        &self,
        api_key: &str,
        agent_id: &str,
        payload: &Value,
    ) -> ServiceResult<Value> {
        let url = self.agent_url(agent_id)?;
        debug!(agent_id, "patching agent configuration");
        self.send(self.client.patch(url).json(payload), api_key).await
    }

    async fn send(&self, request: RequestBuilder, api_key: &str) -> ServiceResult<Value> {
        let response = request
            .header("xi-api-key", api_key)
            .send()
            .await
            .map_err(|e| transport_error(PLATFORM_NAME, &e))?;

        read_json(PLATFORM_NAME, response).await
    }
}
