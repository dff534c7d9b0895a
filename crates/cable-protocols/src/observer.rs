//! Observer protocol for subscription streams.

use serde_json::Value;

use crate::error::SubscriptionError;

/// Receives the lifecycle of one logical subscription.
///
/// `complete` is always terminal. An `error` carried by a frame is not: the
/// next frame may still produce `next`. Errors that end the subscription
/// (rejection, a disconnect under the manual policy) are the last call the
/// observer receives. Stream wrappers may stop at the first error.
pub trait Observer: Send + Sync {
    fn next(&self, value: Value);

    fn error(&self, error: SubscriptionError);

    fn complete(&self);
}
