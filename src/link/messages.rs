use serde::{Deserialize, Serialize};

/// JSON control message carried in text frames
///
/// Binary frames carry audio and never use this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Service-side turn state (e.g. "ready", "listening", "speaking")
    Status {
        state: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Recognized text
    Transcript { text: String },
    /// The service finished its turn
    TurnComplete,
    /// Service-side failure
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_message_type() {
        let status: ControlMessage =
            serde_json::from_str(r#"{"type":"status","state":"ready","message":"Connected"}"#)
                .unwrap();
        assert_eq!(
            status,
            ControlMessage::Status {
                state: "ready".to_string(),
                message: Some("Connected".to_string()),
            }
        );

        let transcript: ControlMessage =
            serde_json::from_str(r#"{"type":"transcript","text":"the cat"}"#).unwrap();
        assert_eq!(
            transcript,
            ControlMessage::Transcript {
                text: "the cat".to_string()
            }
        );

        let done: ControlMessage = serde_json::from_str(r#"{"type":"turn_complete"}"#).unwrap();
        assert_eq!(done, ControlMessage::TurnComplete);
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"mystery"}"#).is_err());
        assert!(serde_json::from_str::<ControlMessage>("not json").is_err());
    }
}
