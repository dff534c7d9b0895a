//! Link pipeline errors.

use serde_json::Value;
use thiserror::Error;

use super::{ChannelError, SubscriptionError};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("No link left to forward the operation to")]
    NoForward,

    #[error("HTTP error: {0}")]
    Http(String),

    /// GraphQL `errors` returned without any `data`.
    #[error("GraphQL errors: {0}")]
    Graphql(Value),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),
}
