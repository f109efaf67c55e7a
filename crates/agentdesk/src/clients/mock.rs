use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use super::sdk::{SttUpload, VoiceSdk};

/// Records every call and answers with a fixed response (or error).
#[derive(Clone, Default)]
pub struct MockVoiceSdk {
    token_response: Option<Value>,
    stt_response: Option<Value>,
    pub token_calls: Arc<Mutex<Vec<String>>>,
    pub stt_calls: Arc<Mutex<Vec<SttUpload>>>,
}

impl MockVoiceSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_response(mut self, response: Value) -> Self {
        self.token_response = Some(response);
        self
    }

    pub fn with_stt_response(mut self, response: Value) -> Self {
        self.stt_response = Some(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.token_calls.lock().unwrap().len() + self.stt_calls.lock().unwrap().len()
    }
}

impl VoiceSdk for MockVoiceSdk {
    fn conversation_token(&self, _api_key: &str, agent_id: &str) -> Result<Value> {
        self.token_calls.lock().unwrap().push(agent_id.to_string());
        self.token_response
            .clone()
            .ok_or_else(|| anyhow!("token endpoint unavailable"))
    }

    fn speech_to_text(&self, _api_key: &str, upload: SttUpload) -> Result<Value> {
        self.stt_calls.lock().unwrap().push(upload);
        self.stt_response
            .clone()
            .ok_or_else(|| anyhow!("speech-to-text unavailable"))
    }
}
