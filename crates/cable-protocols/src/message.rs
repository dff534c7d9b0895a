//! ActionCable wire messages.
//!
//! Client commands carry the channel identifier as a JSON *string*, and
//! `message` commands carry their payload as a JSON string too, with the
//! action name merged into the payload object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// Command sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    Subscribe { identifier: String },
    Unsubscribe { identifier: String },
    Message { identifier: String, data: String },
}

impl ClientCommand {
    pub fn subscribe(identifier: impl Into<String>) -> Self {
        Self::Subscribe {
            identifier: identifier.into(),
        }
    }

    pub fn unsubscribe(identifier: impl Into<String>) -> Self {
        Self::Unsubscribe {
            identifier: identifier.into(),
        }
    }

    /// Build the `message` command for `perform(action, data)`.
    ///
    /// Object payloads get `action` merged in next to their fields; any other
    /// payload is nested under `data`.
    pub fn perform(identifier: impl Into<String>, action: &str, data: Value) -> Result<Self, ProtocolError> {
        let mut payload = match data {
            Value::Object(object) => object,
            Value::Null => Map::new(),
            other => {
                let mut object = Map::new();
                object.insert("data".to_string(), other);
                object
            }
        };
        payload.insert("action".to_string(), Value::String(action.to_string()));

        Ok(Self::Message {
            identifier: identifier.into(),
            data: serde_json::to_string(&Value::Object(payload))?,
        })
    }

    pub fn identifier(&self) -> &str {
        match self {
            Self::Subscribe { identifier }
            | Self::Unsubscribe { identifier }
            | Self::Message { identifier, .. } => identifier,
        }
    }

    /// Decode the payload of a `message` command (`None` for other commands).
    pub fn payload(&self) -> Option<Result<Value, ProtocolError>> {
        match self {
            Self::Message { data, .. } => {
                Some(serde_json::from_str(data).map_err(ProtocolError::from))
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Message pushed from the server to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Welcome,
    Ping(Option<Value>),
    ConfirmSubscription { identifier: String },
    RejectSubscription { identifier: String },
    Disconnect { reason: Option<String>, reconnect: bool },
    /// A frame for one channel.
    Message { identifier: String, message: Value },
}

#[derive(Debug, Deserialize)]
struct RawServerMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    identifier: Option<String>,
    message: Option<Value>,
    reason: Option<String>,
    reconnect: Option<bool>,
}

impl ServerMessage {
    /// Parse one text frame from the socket.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let RawServerMessage {
            kind,
            identifier,
            message,
            reason,
            reconnect,
        } = serde_json::from_str(text).map_err(|e| ProtocolError::MalformedMessage(e.to_string()))?;

        let require_identifier = |identifier: Option<String>| {
            identifier
                .ok_or_else(|| ProtocolError::MalformedMessage("missing 'identifier'".to_string()))
        };

        match kind.as_deref() {
            Some("welcome") => Ok(Self::Welcome),
            Some("ping") => Ok(Self::Ping(message)),
            Some("confirm_subscription") => Ok(Self::ConfirmSubscription {
                identifier: require_identifier(identifier)?,
            }),
            Some("reject_subscription") => Ok(Self::RejectSubscription {
                identifier: require_identifier(identifier)?,
            }),
            Some("disconnect") => Ok(Self::Disconnect {
                reason,
                reconnect: reconnect.unwrap_or(true),
            }),
            Some(other) => Err(ProtocolError::UnknownMessageType(other.to_string())),
            None => {
                let message = message
                    .ok_or_else(|| ProtocolError::MalformedMessage("missing 'message'".to_string()))?;
                Ok(Self::Message {
                    identifier: require_identifier(identifier)?,
                    message,
                })
            }
        }
    }

    /// Encode as the server would send it.
    pub fn to_json(&self) -> String {
        let value = match self {
            Self::Welcome => serde_json::json!({ "type": "welcome" }),
            Self::Ping(message) => serde_json::json!({ "type": "ping", "message": message }),
            Self::ConfirmSubscription { identifier } => {
                serde_json::json!({ "type": "confirm_subscription", "identifier": identifier })
            }
            Self::RejectSubscription { identifier } => {
                serde_json::json!({ "type": "reject_subscription", "identifier": identifier })
            }
            Self::Disconnect { reason, reconnect } => {
                serde_json::json!({ "type": "disconnect", "reason": reason, "reconnect": reconnect })
            }
            Self::Message { identifier, message } => {
                serde_json::json!({ "identifier": identifier, "message": message })
            }
        };
        value.to_string()
    }
}
