//! Blocking calls to the platform's token and speech-to-text APIs.
//!
//! These stand where a vendor SDK would: synchronous from the caller's point
//! of view, so the service dispatches them through [`crate::offload::Offload`].

use anyhow::{anyhow, Result};
use reqwest::blocking::{multipart, Client};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::document::Document;

pub const SDK_TIMEOUT: Duration = Duration::from_secs(60);

/// Audio ready for submission, with the synthesized file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SttUpload {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub model_id: String,
    pub language_code: Option<String>,
}

impl SttUpload {
    pub fn new(
        audio: Vec<u8>,
        format: &str,
        model_id: impl Into<String>,
        language_code: Option<String>,
    ) -> Self {
        Self {
            audio,
            file_name: format!("feedback.{}", format),
            mime_type: format!("audio/{}", format),
            model_id: model_id.into(),
            language_code,
        }
    }
}

pub trait VoiceSdk: Send + Sync {
    /// Issue a conversation credential for `agent_id`.
    fn conversation_token(&self, api_key: &str, agent_id: &str) -> Result<Value>;

    /// Transcribe one uploaded clip.
    fn speech_to_text(&self, api_key: &str, upload: SttUpload) -> Result<Value>;
}

/// [`VoiceSdk`] over the platform's public REST API.
#[derive(Debug, Clone)]
pub struct HttpVoiceSdk {
    base_url: String,
}

impl HttpVoiceSdk {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // The blocking client owns a runtime of its own, so it is built and
    // dropped on the worker thread that uses it.
    fn client() -> Result<Client> {
        Ok(Client::builder().timeout(SDK_TIMEOUT).build()?)
    }

    fn decode(response: reqwest::blocking::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(anyhow!("ElevenLabs returned {}: {}", status, body.trim()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl VoiceSdk for HttpVoiceSdk {
    fn conversation_token(&self, api_key: &str, agent_id: &str) -> Result<Value> {
        let mut url = self.endpoint(&["v1", "convai", "conversation", "token"])?;
        url.query_pairs_mut().append_pair("agent_id", agent_id);

        let response = Self::client()?
            .get(url)
            .header("xi-api-key", api_key)
            .send()?;
        Self::decode(response)
    }

    fn speech_to_text(&self, api_key: &str, upload: SttUpload) -> Result<Value> {
        let url = self.endpoint(&["v1", "speech-to-text"])?;

        let file = multipart::Part::bytes(upload.audio)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let mut form = multipart::Form::new()
            .text("model_id", upload.model_id)
            .part("file", file);
        if let Some(language_code) = upload.language_code {
            form = form.text("language_code", language_code);
        }

        let response = Self::client()?
            .post(url)
            .header("xi-api-key", api_key)
            .multipart(form)
            .send()?;
        Self::decode(response)
    }
}

/// Pull transcript text out of whatever shape the response took: a `text`
/// field, a `transcription` field, a bare string, or as a last resort the
/// value rendered as text.
pub fn extract_transcript(response: &Value) -> Option<String> {
    let text = match response {
        Value::Null => return None,
        Value::String(text) => text.clone(),
        Value::Object(_) => match response.first_str(&["text", "transcription"]) {
            Some(text) => text.to_string(),
            None => response.to_string(),
        },
        other => other.to_string(),
    };

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
