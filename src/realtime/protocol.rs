//! Realtime channel events.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::session::ImageRecord;

/// Events sent by a desktop client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Events pushed to desktop clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Catch-up snapshot sent right after joining a session
    Init { images: Vec<ImageRecord> },

    /// Live push of a freshly uploaded image
    NewImage(ImageRecord),

    /// The last client frame could not be handled
    Error { message: String },
}

impl ServerEvent {
    pub fn init(images: Vec<ImageRecord>) -> Self {
        Self::Init { images }
    }

    pub fn new_image(record: ImageRecord) -> Self {
        Self::NewImage(record)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_session_parses() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"join_session","data":{"sessionId":"s1"}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinSession {
                session_id: "s1".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"leave","data":{}}"#).is_err());
    }

    #[test]
    fn test_server_event_shapes() {
        let record = ImageRecord {
            id: "a.jpg".into(),
            url: "/uploads/s1/a.jpg".into(),
            timestamp: 1.5,
        };

        let init = serde_json::to_value(ServerEvent::init(vec![])).unwrap();
        assert_eq!(init, json!({"event": "init", "data": {"images": []}}));

        let pushed = serde_json::to_value(ServerEvent::new_image(record)).unwrap();
        assert_eq!(
            pushed,
            json!({
                "event": "new_image",
                "data": {"id": "a.jpg", "url": "/uploads/s1/a.jpg", "timestamp": 1.5}
            })
        );
    }
}
