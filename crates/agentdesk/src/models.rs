//! Request and result values exchanged with callers.
//!
//! Field names serialize in snake_case, the shape the web client reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::Document;

const TOKEN_KEYS: &[&str] = &["token", "conversationToken", "conversation_token"];

/// Credential payload for opening a conversation, passed through from the
/// platform with `agent_id` guaranteed present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationToken(Map<String, Value>);

impl ConversationToken {
    /// Wrap a raw platform payload, filling `agent_id` only when the platform
    /// left it out or blank.
    pub fn from_payload(mut payload: Map<String, Value>, agent_id: &str) -> Self {
        let echoed = payload
            .str_at(&["agent_id"])
            .is_some_and(|id| !id.is_empty());
        if !echoed {
            payload.insert("agent_id".to_string(), Value::String(agent_id.to_string()));
        }
        Self(payload)
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.0.str_at(&["agent_id"])
    }

    /// The token string under whichever key the platform used.
    pub fn token(&self) -> Option<&str> {
        self.0.first_str(TOKEN_KEYS).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSnapshot {
    pub agent_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub first_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptUpdate {
    pub prompt: String,
    #[serde(default)]
    pub first_message: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSuggestion {
    pub agent_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub current_prompt: String,
    pub suggested_prompt: String,
}

fn default_audio_format() -> String {
    "webm".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    /// Base64-encoded audio bytes.
    pub audio: String,
    #[serde(default = "default_audio_format")]
    pub format: String,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

impl TranscriptionRequest {
    pub fn new(audio: impl Into<String>) -> Self {
        Self {
            audio: audio.into(),
            format: default_audio_format(),
            language_code: None,
            model_id: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
}
