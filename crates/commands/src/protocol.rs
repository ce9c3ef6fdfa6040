//! Wire messages exchanged over the command socket.
//!
//! Client → server:
//! - `{"action": "start_command", "command": "<words>"}`
//! - `{"action": "cancel_command"}`
//!
//! Server → client:
//! - `{"type": "stdout", "message": "<line incl. terminator>"}`
//! - `{"type": "finished", "return_code": <int>}`
//! - `{"type": "error", "error": "<code>", "message": "<text>"}`

use serde::{Deserialize, Serialize};

/// Notice sent when a start request arrives while a job is live.
pub const ALREADY_RUNNING_TEXT: &str = "Another command is already running. Cancel it first.\n";

/// Notice sent once a cancelled job has exited.
pub const CANCELLED_TEXT: &str = "\n=== Command cancelled by user ===\n";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    StartCommand { command: String },
    CancelCommand,
}

impl ClientMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Stdout { message: String },
    Finished { return_code: i32 },
    Error { error: String, message: String },
}

impl ServerMessage {
    pub fn stdout(message: impl Into<String>) -> Self {
        Self::Stdout {
            message: message.into(),
        }
    }

    pub fn finished(return_code: i32) -> Self {
        Self::Finished { return_code }
    }

    pub fn already_running() -> Self {
        Self::stdout(ALREADY_RUNNING_TEXT)
    }

    pub fn cancelled() -> Self {
        Self::stdout(CANCELLED_TEXT)
    }

    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::Error {
            error: "spawn_failed".to_string(),
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_start_command() {
        let msg = ClientMessage::parse(r#"{"action":"start_command","command":"check_data --dry-run"}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::StartCommand {
                command: "check_data --dry-run".to_string()
            }
        );
    }

    #[test]
    fn cancel_ignores_extra_fields() {
        let msg = ClientMessage::parse(r#"{"action":"cancel_command","command":"migrate"}"#).unwrap();
        assert_eq!(msg, ClientMessage::CancelCommand);
    }

    #[test]
    fn rejects_unknown_or_missing_action() {
        assert!(ClientMessage::parse(r#"{"action":"reboot"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"command":"migrate"}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse("").is_err());
    }

    #[test]
    fn start_without_command_is_rejected() {
        assert!(ClientMessage::parse(r#"{"action":"start_command"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"action":"start_command","command":7}"#).is_err());
    }

    #[test]
    fn server_messages_use_wire_shape() {
        assert_eq!(
            serde_json::to_value(ServerMessage::stdout("hi\n")).unwrap(),
            json!({"type": "stdout", "message": "hi\n"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::finished(-15)).unwrap(),
            json!({"type": "finished", "return_code": -15})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::spawn_failed("no such file")).unwrap(),
            json!({"type": "error", "error": "spawn_failed", "message": "no such file"})
        );
    }

    proptest! {
        #[test]
        fn parse_never_panics(raw in ".*") {
            let _ = ClientMessage::parse(&raw);
        }

        #[test]
        fn any_command_string_round_trips(command in ".*") {
            let raw = json!({"action": "start_command", "command": command.clone()}).to_string();
            prop_assert_eq!(ClientMessage::parse(&raw).unwrap(), ClientMessage::StartCommand { command });
        }
    }
}
