//! Errors delivered to a subscription observer.

use serde_json::Value;
use thiserror::Error;

/// What an [`Observer`](crate::Observer) receives through `error`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubscriptionError {
    /// Error payload pushed by the server in a frame.
    #[error("Remote error: {0}")]
    Remote(Value),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// The connection dropped and the resubscribe policy is `manual`.
    #[error("Subscription disconnected")]
    Disconnected,

    #[error("Subscription rejected by server")]
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = SubscriptionError::Remote(Value::String("E".to_string()));
        assert!(err.to_string().contains("\"E\""));
    }

    #[test]
    fn test_errors_compare() {
        assert_eq!(SubscriptionError::Rejected, SubscriptionError::Rejected);
        assert_ne!(SubscriptionError::Rejected, SubscriptionError::Disconnected);
    }
}
