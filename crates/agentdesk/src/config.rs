use serde::Deserialize;
use std::fmt;

pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_STT_MODEL: &str = "scribe_v1";

/// Immutable snapshot of everything the service reads from its environment.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it
/// afterwards.
#[derive(Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub elevenlabs_api_key: Option<String>,
    #[serde(default)]
    pub elevenlabs_agent_id: Option<String>,
    #[serde(default = "default_elevenlabs_base_url")]
    pub elevenlabs_base_url: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_stt_model", alias = "elevenlabs_stt_model")]
    pub stt_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: None,
            elevenlabs_agent_id: None,
            elevenlabs_base_url: default_elevenlabs_base_url(),
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            stt_model: default_stt_model(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("elevenlabs_api_key", &redact(&self.elevenlabs_api_key))
            .field("elevenlabs_agent_id", &self.elevenlabs_agent_id)
            .field("elevenlabs_base_url", &self.elevenlabs_base_url)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("stt_model", &self.stt_model)
            .finish()
    }
}

impl Settings {
    /// True iff a non-empty platform key is configured.
    pub fn has_credentials(&self) -> bool {
        self.elevenlabs_api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }

    /// Collapse empty optional values to `None` and blank required values to
    /// their defaults, so an exported-but-empty variable reads as unset.
    pub fn normalized(self) -> Self {
        Self {
            elevenlabs_api_key: non_empty(self.elevenlabs_api_key),
            elevenlabs_agent_id: non_empty(self.elevenlabs_agent_id),
            elevenlabs_base_url: or_default(self.elevenlabs_base_url, default_elevenlabs_base_url),
            openai_api_key: non_empty(self.openai_api_key),
            openai_base_url: or_default(self.openai_base_url, default_openai_base_url),
            openai_model: or_default(self.openai_model, default_openai_model),
            stt_model: or_default(self.stt_model, default_stt_model),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn or_default(value: String, default: fn() -> String) -> String {
    let value = value.trim();
    if value.is_empty() {
        default()
    } else {
        value.to_string()
    }
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_elevenlabs_base_url() -> String {
    DEFAULT_ELEVENLABS_BASE_URL.to_string()
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_stt_model() -> String {
    DEFAULT_STT_MODEL.to_string()
}
