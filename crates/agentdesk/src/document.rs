//! Path lookups over loosely shaped JSON documents.
//!
//! Remote payloads are not guaranteed to have any particular shape, so every
//! lookup returns `None` for a missing or mistyped node instead of failing.

use serde_json::{Map, Value};

pub const PROMPT_PATH: &[&str] = &["conversation_config", "agent", "prompt", "prompt"];
pub const PROMPT_BLOCK_PATH: &[&str] = &["conversation_config", "agent", "prompt"];
pub const FIRST_MESSAGE_PATH: &[&str] = &["conversation_config", "agent", "first_message"];
pub const AGENT_ID_PATH: &[&str] = &["agent_id"];
pub const DISPLAY_NAME_PATH: &[&str] = &["display_name"];

pub trait Document {
    /// The node at `path`, descending through objects only.
    fn at(&self, path: &[&str]) -> Option<&Value>;

    fn str_at(&self, path: &[&str]) -> Option<&str> {
        self.at(path).and_then(Value::as_str)
    }

    fn object_at(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        self.at(path).and_then(Value::as_object)
    }

    /// First string found under any of `keys` at the top level.
    fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.str_at(&[*key]))
    }
}

impl Document for Value {
    fn at(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |node, key| node.as_object()?.get(*key))
    }
}

impl Document for Map<String, Value> {
    fn at(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let head = self.get(*first)?;
        if rest.is_empty() {
            Some(head)
        } else {
            head.at(rest)
        }
    }
}
