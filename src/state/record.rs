use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Loosely typed attribute value as reported by Home Assistant.
///
/// The upstream schema differs per entity domain, so values are kept as a
/// tagged union and inspected with typed accessors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Arrays and nested objects
    Json(serde_json::Value),
}

impl AttributeValue {
    /// Numeric value, `None` for every other variant
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean value, `None` for every other variant
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

/// One observed snapshot of an entity's state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Entity identifier (e.g., "person.alice", "device_tracker.phone")
    pub entity_id: String,

    /// Status string ("home", "not_home", a zone name, ...)
    #[serde(rename = "state")]
    pub status: String,

    /// Open attribute mapping
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,

    pub last_changed: DateTime<Utc>,

    pub last_updated: DateTime<Utc>,
}

impl StateRecord {
    /// Create a record with no attributes, both timestamps set to now
    pub fn new(entity_id: impl Into<String>, status: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entity_id: entity_id.into(),
            status: status.into(),
            attributes: HashMap::new(),
            last_changed: now,
            last_updated: now,
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up a numeric attribute; wrong type is treated as absent
    pub fn number_attribute(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(AttributeValue::as_number)
    }

    /// Look up a boolean attribute; wrong type is treated as absent
    pub fn bool_attribute(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(AttributeValue::as_bool)
    }
}
