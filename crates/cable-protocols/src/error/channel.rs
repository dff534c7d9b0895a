//! Channel errors.

use thiserror::Error;

use super::ProtocolError;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Subscription already active; call unsubscribe first")]
    AlreadySubscribed,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Channel disconnected")]
    Disconnected,

    #[error("Consumer closed")]
    Closed,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
