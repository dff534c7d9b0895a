//! Cable link.
//!
//! Terminates subscription operations on the cable and forwards everything
//! else down the chain.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use cable_config::{CableConfig, ResubscribePolicy};
use cable_protocols::{
    Forward, Link, LinkError, Observer, Operation, OperationStream, SubscriptionError,
    DEFAULT_CHANNEL,
};
use futures::{stream, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::consumer::Consumer;
use crate::graphql::GraphqlChannel;

/// Routes subscriptions over a shared consumer.
pub struct CableLink {
    consumer: Arc<Consumer>,
    channel: String,
    policy: ResubscribePolicy,
}

impl CableLink {
    pub fn new(consumer: Arc<Consumer>) -> Self {
        Self {
            consumer,
            channel: DEFAULT_CHANNEL.to_string(),
            policy: ResubscribePolicy::default(),
        }
    }

    /// Link using the channel name and resubscribe policy from `config`.
    pub fn from_config(consumer: Arc<Consumer>, config: &CableConfig) -> Self {
        Self::new(consumer)
            .with_channel(config.channel.clone())
            .with_policy(config.resubscribe)
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_policy(mut self, policy: ResubscribePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn consumer(&self) -> &Arc<Consumer> {
        &self.consumer
    }
}

impl Link for CableLink {
    fn request(&self, operation: Operation, forward: Forward<'_>) -> OperationStream {
        if !operation.is_subscription() {
            return forward.call(operation);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = GraphqlChannel::new(self.consumer.handle()).with_policy(self.policy);
        let observer = Arc::new(StreamObserver { events: tx });

        match adapter.subscribe(operation.request, &self.channel, observer) {
            Ok(()) => {
                debug!(channel = %self.channel, "Subscription routed over cable");
                SubscriptionStream {
                    events: rx,
                    adapter: Some(adapter),
                }
                .boxed()
            }
            Err(e) => stream::iter([Err(LinkError::Channel(e))]).boxed(),
        }
    }
}

enum StreamEvent {
    Next(Value),
    Error(SubscriptionError),
    Complete,
}

struct StreamObserver {
    events: mpsc::UnboundedSender<StreamEvent>,
}

impl Observer for StreamObserver {
    fn next(&self, value: Value) {
        let _ = self.events.send(StreamEvent::Next(value));
    }

    fn error(&self, error: SubscriptionError) {
        let _ = self.events.send(StreamEvent::Error(error));
    }

    fn complete(&self) {
        let _ = self.events.send(StreamEvent::Complete);
    }
}

/// Result stream of one cable subscription.
///
/// The first error ends the stream. Dropping the stream unsubscribes.
pub struct SubscriptionStream {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    adapter: Option<GraphqlChannel>,
}

impl SubscriptionStream {
    fn close(&mut self) {
        if let Some(adapter) = self.adapter.take() {
            adapter.unsubscribe();
        }
        self.events.close();
    }
}

impl Stream for SubscriptionStream {
    type Item = Result<Value, LinkError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.adapter.is_none() {
            return Poll::Ready(None);
        }

        match this.events.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(StreamEvent::Next(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(Some(StreamEvent::Error(error))) => {
                this.close();
                Poll::Ready(Some(Err(LinkError::Subscription(error))))
            }
            Poll::Ready(Some(StreamEvent::Complete)) | Poll::Ready(None) => {
                this.close();
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for SubscriptionStream {
    fn drop(&mut self) {
        self.close();
    }
}
