//! Reading and partially updating an agent's stored prompt.

use serde_json::{json, Map, Value};

use crate::document::{
    Document, AGENT_ID_PATH, DISPLAY_NAME_PATH, FIRST_MESSAGE_PATH, PROMPT_BLOCK_PATH, PROMPT_PATH,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::PromptSnapshot;

/// Prompt fields pulled out of an agent document. Every field is optional
/// because the remote does not promise any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPrompt {
    pub agent_id: Option<String>,
    pub display_name: Option<String>,
    pub prompt: Option<String>,
    pub first_message: Option<String>,
}

pub fn extract_prompt(doc: &Value) -> ExtractedPrompt {
    ExtractedPrompt {
        agent_id: doc
            .str_at(AGENT_ID_PATH)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        display_name: display_name(doc),
        prompt: doc.str_at(PROMPT_PATH).map(str::to_string),
        first_message: doc.str_at(FIRST_MESSAGE_PATH).map(str::to_string),
    }
}

fn display_name(doc: &Value) -> Option<String> {
    doc.str_at(DISPLAY_NAME_PATH)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

pub fn ensure_prompt_text(prompt: &str) -> ServiceResult<()> {
    if prompt.trim().is_empty() {
        return Err(ServiceError::invalid_request("Prompt must not be empty"));
    }
    Ok(())
}

/// Build the PATCH body that swaps in `new_prompt`.
///
/// Sibling keys of the existing prompt block are carried over untouched.
/// `first_message` is only written when one is given. The result holds
/// nothing but `conversation_config`.
pub fn build_update_payload(
    existing: &Value,
    new_prompt: &str,
    new_first_message: Option<&str>,
) -> ServiceResult<Value> {
    ensure_prompt_text(new_prompt)?;

    let mut prompt_block: Map<String, Value> = existing
        .object_at(PROMPT_BLOCK_PATH)
        .cloned()
        .unwrap_or_default();
    prompt_block.insert("prompt".to_string(), Value::String(new_prompt.to_string()));

    let mut agent = Map::new();
    agent.insert("prompt".to_string(), Value::Object(prompt_block));
    if let Some(first_message) = new_first_message {
        agent.insert(
            "first_message".to_string(),
            Value::String(first_message.to_string()),
        );
    }

    Ok(json!({ "conversation_config": { "agent": agent } }))
}

/// Shape the result of an update from the platform's echo, falling back to
/// what was sent for anything the echo leaves out.
pub fn updated_snapshot(
    updated: &Value,
    agent_id: &str,
    sent_prompt: &str,
    sent_first_message: Option<&str>,
) -> PromptSnapshot {
    let echoed = extract_prompt(updated);
    PromptSnapshot {
        agent_id: echoed.agent_id.unwrap_or_else(|| agent_id.to_string()),
        display_name: echoed.display_name,
        prompt: Some(echoed.prompt.unwrap_or_else(|| sent_prompt.to_string())),
        first_message: echoed
            .first_message
            .or_else(|| sent_first_message.map(str::to_string)),
    }
}
