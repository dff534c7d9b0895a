//! Inbound subscription frames.

use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// One notification derived from a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    Next(Value),
    Error(Value),
}

/// A decoded `{result?, error?, more?}` frame.
///
/// `null` members count as absent. A frame with neither `result` nor `error`
/// is malformed unless it is a bare `more: false` end marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub more: Option<bool>,
}

impl Frame {
    pub fn parse(message: Value) -> Result<Self, ProtocolError> {
        let mut object = match message {
            Value::Object(object) => object,
            other => {
                return Err(ProtocolError::MalformedFrame(format!(
                    "expected an object, got {}",
                    other
                )))
            }
        };

        let frame = Self {
            result: take_present(&mut object, "result"),
            error: take_present(&mut object, "error"),
            more: match object.remove("more") {
                None | Some(Value::Null) => None,
                Some(Value::Bool(more)) => Some(more),
                Some(other) => {
                    return Err(ProtocolError::MalformedFrame(format!(
                        "'more' must be a boolean, got {}",
                        other
                    )))
                }
            },
        };

        if frame.result.is_none() && frame.error.is_none() && !frame.is_final() {
            return Err(ProtocolError::MalformedFrame(
                "frame has neither 'result' nor 'error'".to_string(),
            ));
        }

        Ok(frame)
    }

    /// Server signalled the end of the stream.
    pub fn is_final(&self) -> bool {
        self.more == Some(false)
    }

    /// Notifications in delivery order: `next` before `error`.
    pub fn events(self) -> Vec<FrameEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(result) = self.result {
            events.push(FrameEvent::Next(result));
        }
        if let Some(error) = self.error {
            events.push(FrameEvent::Error(error));
        }
        events
    }
}

fn take_present(object: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match object.remove(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value),
    }
}
