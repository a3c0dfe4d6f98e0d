use crate::state::StateRecord;
use serde::{Deserialize, Serialize};

/// Client → Server message types
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { entity_id: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { entity_id: String },
}

/// Server → Client: one entity state
#[derive(Debug, Clone, Serialize)]
pub struct StateMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub record: StateRecord,
}

impl From<StateRecord> for StateMessage {
    fn from(record: StateRecord) -> Self {
        Self {
            msg_type: "state".to_string(),
            record,
        }
    }
}

/// Server → Client: Error message
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub error: String,
}

impl ErrorMessage {
    pub fn new(error: String) -> Self {
        Self {
            msg_type: "error".to_string(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subscribe() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","entity_id":"person.alice"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { entity_id } if entity_id == "person.alice"));
    }

    #[test]
    fn test_parse_unknown_type_fails() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"reset"}"#).is_err());
    }

    #[test]
    fn test_state_message_flattens_record() {
        let record = StateRecord::new("person.alice", "home").with_attribute("latitude", 1.5);
        let json = serde_json::to_value(StateMessage::from(record)).unwrap();

        assert_eq!(json["type"], "state");
        assert_eq!(json["entity_id"], "person.alice");
        assert_eq!(json["state"], "home");
        assert_eq!(json["attributes"]["latitude"], 1.5);
    }
}
