use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A single post as returned by the server.
///
/// Only the `id` is interpreted; the rest of the payload is kept verbatim
/// and shared between clones.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: String,
    raw: Arc<Value>,
}

impl Note {
    /// Build a note carrying nothing but its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let raw = Value::Object(
            [("id".to_string(), Value::String(id.clone()))]
                .into_iter()
                .collect(),
        );
        Self {
            id,
            raw: Arc::new(raw),
        }
    }

    /// Best-effort text for display, falling back to the content warning.
    pub fn display_text(&self) -> &str {
        self.raw
            .get("text")
            .and_then(Value::as_str)
            .or_else(|| self.raw.get("cw").and_then(Value::as_str))
            .unwrap_or("")
    }

    pub fn display_author(&self) -> &str {
        self.raw
            .get("user")
            .and_then(|u| u.get("username"))
            .and_then(Value::as_str)
            .unwrap_or("?")
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| D::Error::missing_field("id"))?;
        Ok(Self {
            id,
            raw: Arc::new(raw),
        })
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}
