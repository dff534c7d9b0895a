//! Channel subscription.
//!
//! A [`ChannelSubscription`] is one logical channel on a shared consumer.
//! It holds at most one live identifier at a time and moves through
//! `Unsubscribed -> Pending -> Active`. Events are routed to its callbacks
//! only while the identifier they carry is the current one.

use std::sync::{Arc, Weak};

use cable_protocols::{ChannelError, ChannelIdentifier, ClientCommand};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::consumer::{ChannelHandler, ConsumerHandle};

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;

/// Lifecycle of a channel subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Unsubscribed,
    /// Registered with the consumer, waiting for confirmation.
    Pending,
    /// Confirmed by the server.
    Active,
}

type Callback = Box<dyn Fn(&ChannelSubscription) + Send + Sync>;
type DisconnectedCallback = Box<dyn Fn(&ChannelSubscription, bool) + Send + Sync>;
type ReceivedCallback = Box<dyn Fn(&ChannelSubscription, Value) + Send + Sync>;

/// Callbacks for one subscribe call. Each receives the subscription so it
/// can `perform` or `unsubscribe` without capturing it.
#[derive(Default)]
pub struct ChannelCallbacks {
    connected: Option<Callback>,
    disconnected: Option<DisconnectedCallback>,
    received: Option<ReceivedCallback>,
    rejected: Option<Callback>,
}

impl ChannelCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connected(mut self, f: impl Fn(&ChannelSubscription) + Send + Sync + 'static) -> Self {
        self.connected = Some(Box::new(f));
        self
    }

    /// The flag tells whether the consumer will reconnect and resubscribe.
    pub fn on_disconnected(
        mut self,
        f: impl Fn(&ChannelSubscription, bool) + Send + Sync + 'static,
    ) -> Self {
        self.disconnected = Some(Box::new(f));
        self
    }

    pub fn on_received(
        mut self,
        f: impl Fn(&ChannelSubscription, Value) + Send + Sync + 'static,
    ) -> Self {
        self.received = Some(Box::new(f));
        self
    }

    pub fn on_rejected(mut self, f: impl Fn(&ChannelSubscription) + Send + Sync + 'static) -> Self {
        self.rejected = Some(Box::new(f));
        self
    }
}

struct ChannelState {
    status: ChannelStatus,
    identifier: Option<String>,
}

struct Shared {
    consumer: ConsumerHandle,
    state: Mutex<ChannelState>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(identifier) = self.state.get_mut().identifier.take() {
            self.consumer.unsubscribe(identifier);
        }
    }
}

/// One logical channel bound to a consumer.
///
/// Clones share state. When the last clone is dropped the live identifier,
/// if any, is unsubscribed.
#[derive(Clone)]
pub struct ChannelSubscription {
    shared: Arc<Shared>,
}

impl ChannelSubscription {
    pub fn new(consumer: ConsumerHandle) -> Self {
        Self {
            shared: Arc::new(Shared {
                consumer,
                state: Mutex::new(ChannelState {
                    status: ChannelStatus::Unsubscribed,
                    identifier: None,
                }),
            }),
        }
    }

    /// Subscribe to `channel` under a fresh unique identifier.
    pub fn subscribe(&self, channel: &str, callbacks: ChannelCallbacks) -> Result<(), ChannelError> {
        self.subscribe_to(ChannelIdentifier::unique(channel)?, callbacks)
    }

    /// Subscribe with an explicit identifier.
    ///
    /// Fails with [`ChannelError::AlreadySubscribed`] while another
    /// identifier is live.
    pub fn subscribe_to(
        &self,
        identifier: ChannelIdentifier,
        callbacks: ChannelCallbacks,
    ) -> Result<(), ChannelError> {
        let wire = identifier.to_wire();
        let mut state = self.shared.state.lock();
        if state.identifier.is_some() {
            return Err(ChannelError::AlreadySubscribed);
        }

        let router = Arc::new(Router {
            shared: Arc::downgrade(&self.shared),
            identifier: wire.clone(),
            callbacks,
        });
        self.shared.consumer.subscribe(wire.clone(), router)?;

        debug!(identifier = %wire, "Channel subscription pending");
        state.identifier = Some(wire);
        state.status = ChannelStatus::Pending;
        Ok(())
    }

    /// Drop the live identifier. Calling it again, or before subscribing,
    /// does nothing.
    pub fn unsubscribe(&self) {
        let identifier = {
            let mut state = self.shared.state.lock();
            state.status = ChannelStatus::Unsubscribed;
            state.identifier.take()
        };
        if let Some(identifier) = identifier {
            debug!(%identifier, "Channel unsubscribed");
            self.shared.consumer.unsubscribe(identifier);
        }
    }

    /// Send `action` with `data` to the server side of the channel.
    ///
    /// Delivered only while the subscription is active; otherwise nothing is
    /// sent and `false` is returned.
    pub fn perform(&self, action: &str, data: Value) -> bool {
        let identifier = {
            let state = self.shared.state.lock();
            match (&state.identifier, state.status) {
                (Some(identifier), ChannelStatus::Active) => identifier.clone(),
                _ => {
                    debug!(action, "perform on inactive channel ignored");
                    return false;
                }
            }
        };

        match ClientCommand::perform(identifier, action, data) {
            Ok(command) => self.shared.consumer.send(command),
            Err(e) => {
                warn!(action, "Failed to encode perform payload: {}", e);
                false
            }
        }
    }

    pub fn status(&self) -> ChannelStatus {
        self.shared.state.lock().status
    }

    /// The live wire identifier, if subscribed.
    pub fn identifier(&self) -> Option<String> {
        self.shared.state.lock().identifier.clone()
    }
}

impl std::fmt::Debug for ChannelSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ChannelSubscription")
            .field("status", &state.status)
            .field("identifier", &state.identifier)
            .finish()
    }
}

/// Consumer-side handler for one identifier. Forwards to the callbacks
/// only while that identifier is still the subscription's live one.
struct Router {
    shared: Weak<Shared>,
    identifier: String,
    callbacks: ChannelCallbacks,
}

impl Router {
    /// Upgrade and apply `update` if this router is still current.
    fn current(
        &self,
        update: impl FnOnce(&mut ChannelState) -> bool,
    ) -> Option<ChannelSubscription> {
        let shared = self.shared.upgrade()?;
        {
            let mut state = shared.state.lock();
            if state.identifier.as_deref() != Some(self.identifier.as_str()) {
                return None;
            }
            if !update(&mut state) {
                return None;
            }
        }
        Some(ChannelSubscription { shared })
    }
}

impl ChannelHandler for Router {
    fn connected(&self) {
        let Some(channel) = self.current(|state| {
            state.status = ChannelStatus::Active;
            true
        }) else {
            return;
        };
        if let Some(callback) = &self.callbacks.connected {
            callback(&channel);
        }
    }

    fn disconnected(&self, will_reconnect: bool) {
        let Some(channel) = self.current(|state| {
            if will_reconnect {
                state.status = ChannelStatus::Pending;
            } else {
                state.status = ChannelStatus::Unsubscribed;
                state.identifier = None;
            }
            true
        }) else {
            return;
        };
        if let Some(callback) = &self.callbacks.disconnected {
            callback(&channel, will_reconnect);
        }
    }

    fn received(&self, message: Value) {
        let Some(channel) = self.current(|state| state.status == ChannelStatus::Active) else {
            return;
        };
        if let Some(callback) = &self.callbacks.received {
            callback(&channel, message);
        }
    }

    fn rejected(&self) {
        let Some(channel) = self.current(|state| {
            state.status = ChannelStatus::Unsubscribed;
            state.identifier = None;
            true
        }) else {
            return;
        };
        if let Some(callback) = &self.callbacks.rejected {
            callback(&channel);
        }
    }
}
