//! GraphQL subscriptions over a channel.
//!
//! [`GraphqlChannel`] subscribes a channel, sends the operation with the
//! `execute` action once the server confirms, and turns incoming frames into
//! observer notifications. Frame errors leave the subscription running;
//! after `complete` or a terminal `error` (rejection, manual-policy
//! disconnect) the adapter ignores everything else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cable_config::ResubscribePolicy;
use cable_protocols::{
    ChannelError, Frame, FrameEvent, GraphqlRequest, Observer, SubscriptionError,
};
use tracing::{debug, warn};

use crate::channel::{ChannelCallbacks, ChannelStatus, ChannelSubscription};
use crate::consumer::ConsumerHandle;

#[cfg(test)]
#[path = "graphql_tests.rs"]
mod tests;

/// Action the server-side channel executes operations under.
pub const EXECUTE_ACTION: &str = "execute";

/// Terminal-state latch shared by the callbacks of one subscription.
#[derive(Default)]
struct Finished(AtomicBool);

impl Finished {
    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `true` for the one caller that actually finishes the stream.
    fn set(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

/// Runs one GraphQL subscription on its own channel.
#[derive(Debug)]
pub struct GraphqlChannel {
    channel: ChannelSubscription,
    policy: ResubscribePolicy,
}

impl GraphqlChannel {
    pub fn new(consumer: ConsumerHandle) -> Self {
        Self {
            channel: ChannelSubscription::new(consumer),
            policy: ResubscribePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ResubscribePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Start the subscription. The query is sent once per confirmation;
    /// frames are delivered to `observer` until the stream finishes.
    pub fn subscribe(
        &self,
        request: GraphqlRequest,
        channel_name: &str,
        observer: Arc<dyn Observer>,
    ) -> Result<(), ChannelError> {
        let payload = request.to_value();
        let finished = Arc::new(Finished::default());
        let policy = self.policy;

        let callbacks = ChannelCallbacks::new()
            .on_connected({
                let finished = finished.clone();
                move |channel| {
                    if finished.is_set() {
                        return;
                    }
                    if !channel.perform(EXECUTE_ACTION, payload.clone()) {
                        warn!("Failed to send GraphQL operation on confirmed channel");
                    }
                }
            })
            .on_received({
                let finished = finished.clone();
                let observer = observer.clone();
                move |channel, message| {
                    if finished.is_set() {
                        return;
                    }
                    let frame = match Frame::parse(message) {
                        Ok(frame) => frame,
                        Err(e) => {
                            observer.error(SubscriptionError::MalformedFrame(e.to_string()));
                            return;
                        }
                    };
                    let is_final = frame.is_final();
                    for event in frame.events() {
                        match event {
                            FrameEvent::Next(value) => observer.next(value),
                            FrameEvent::Error(error) => observer.error(SubscriptionError::Remote(error)),
                        }
                    }
                    if is_final && finished.set() {
                        debug!("GraphQL subscription finished by server");
                        channel.unsubscribe();
                        observer.complete();
                    }
                }
            })
            .on_disconnected({
                let finished = finished.clone();
                let observer = observer.clone();
                move |channel, will_reconnect| {
                    if policy == ResubscribePolicy::AutoResubscribe && will_reconnect {
                        debug!("Connection lost, operation will be re-sent after reconnect");
                        return;
                    }
                    if !finished.set() {
                        return;
                    }
                    channel.unsubscribe();
                    match policy {
                        ResubscribePolicy::Manual => observer.error(SubscriptionError::Disconnected),
                        _ => observer.complete(),
                    }
                }
            })
            .on_rejected(move |_| {
                if finished.set() {
                    observer.error(SubscriptionError::Rejected);
                }
            });

        self.channel.subscribe(channel_name, callbacks)
    }

    /// Stop the subscription. The observer is not notified.
    pub fn unsubscribe(&self) {
        self.channel.unsubscribe();
    }

    pub fn status(&self) -> ChannelStatus {
        self.channel.status()
    }

    pub fn policy(&self) -> ResubscribePolicy {
        self.policy
    }
}
