//! Channel identifiers.
//!
//! ActionCable addresses a channel by the JSON serialization of its params
//! (`{"channel": "...", ...}`). The server echoes that exact string back on
//! every confirmation and frame, so the serialized form is the routing key.

use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// Channel used for GraphQL execution when the caller names none.
pub const DEFAULT_CHANNEL: &str = "GraphqlChannel";

/// Name plus identifying params of one logical channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelIdentifier {
    channel: String,
    params: Map<String, Value>,
}

impl ChannelIdentifier {
    /// Create an identifier for the named channel with no extra params.
    pub fn new(channel: impl Into<String>) -> Result<Self, ProtocolError> {
        let channel = channel.into();
        if channel.trim().is_empty() {
            return Err(ProtocolError::InvalidIdentifier(
                "channel name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            channel,
            params: Map::new(),
        })
    }

    /// Create an identifier carrying a fresh `channelId`, so that several
    /// subscriptions to the same channel stay distinguishable on one socket.
    pub fn unique(channel: impl Into<String>) -> Result<Self, ProtocolError> {
        Ok(Self::new(channel)?.with_param("channelId", uuid::Uuid::new_v4().simple().to_string()))
    }

    /// Add an identifying param.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "channel" {
            self.params.insert(key, value.into());
        }
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// The wire form used as `identifier` in commands and frames.
    pub fn to_wire(&self) -> String {
        let mut object = self.params.clone();
        object.insert("channel".to_string(), Value::String(self.channel.clone()));
        Value::Object(object).to_string()
    }

    /// Parse the wire form back into an identifier.
    pub fn from_wire(wire: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(wire)?;
        let Value::Object(mut object) = value else {
            return Err(ProtocolError::InvalidIdentifier(format!(
                "expected a JSON object, got {}",
                wire
            )));
        };
        let channel = match object.remove("channel") {
            Some(Value::String(channel)) => channel,
            _ => {
                return Err(ProtocolError::InvalidIdentifier(
                    "missing 'channel' field".to_string(),
                ))
            }
        };
        let mut identifier = Self::new(channel)?;
        identifier.params = object;
        Ok(identifier)
    }
}
