//! Cable consumer.
//!
//! A [`Consumer`] owns one logical socket to a cable endpoint. A background
//! task holds the transport halves and the subscription registry; everything
//! else talks to it through an unbounded command channel, so the public
//! surface is synchronous and never blocks.

use std::collections::HashMap;
use std::sync::Arc;

use cable_config::ReconnectConfig;
use cable_protocols::{
    ChannelError, ChannelIdentifier, ClientCommand, FrameSink, ServerMessage, Transport,
    TransportConnection,
};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use url::Url;

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;

/// Receives the events routed to one channel identifier.
///
/// Called from the consumer task; implementations must not block.
pub trait ChannelHandler: Send + Sync {
    /// The server confirmed the subscription.
    fn connected(&self);

    /// The socket dropped. `will_reconnect` tells whether the consumer is
    /// going to re-establish the socket and resubscribe.
    fn disconnected(&self, will_reconnect: bool);

    /// A frame arrived for this identifier.
    fn received(&self, message: Value);

    /// The server refused the subscription.
    fn rejected(&self);
}

/// Socket state as seen from outside the consumer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    /// Welcome received.
    Open,
    /// Waiting to retry after `attempt` consecutive failures.
    Reconnecting { attempt: u32 },
    /// The consumer has shut down for good.
    Closed,
}

pub(crate) enum ConsumerCommand {
    Subscribe {
        identifier: String,
        handler: Arc<dyn ChannelHandler>,
    },
    Unsubscribe {
        identifier: String,
    },
    Send(ClientCommand),
    Disconnect,
}

/// Cheap cloneable handle for talking to a consumer task.
#[derive(Clone)]
pub struct ConsumerHandle {
    commands: mpsc::UnboundedSender<ConsumerCommand>,
}

impl ConsumerHandle {
    /// Register `handler` for `identifier` and subscribe once the socket is open.
    pub fn subscribe(
        &self,
        identifier: impl Into<String>,
        handler: Arc<dyn ChannelHandler>,
    ) -> Result<(), ChannelError> {
        self.commands
            .send(ConsumerCommand::Subscribe {
                identifier: identifier.into(),
                handler,
            })
            .map_err(|_| ChannelError::Closed)
    }

    /// Drop the registration for `identifier`. Unknown identifiers are ignored.
    pub fn unsubscribe(&self, identifier: impl Into<String>) {
        let _ = self.commands.send(ConsumerCommand::Unsubscribe {
            identifier: identifier.into(),
        });
    }

    /// Queue a command for an active subscription. Returns `false` if the
    /// consumer has already shut down.
    pub fn send(&self, command: ClientCommand) -> bool {
        self.commands.send(ConsumerCommand::Send(command)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

impl std::fmt::Debug for ConsumerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One socket to a cable endpoint.
///
/// Dropping the consumer disconnects it.
pub struct Consumer {
    url: Url,
    handle: ConsumerHandle,
    state: watch::Receiver<ConnectionState>,
    _task: JoinHandle<()>,
}

impl Consumer {
    /// Spawn the connection task and start connecting immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(url: Url, transport: Arc<dyn Transport>, reconnect: ReconnectConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let task = ConnectionTask {
            url: url.clone(),
            transport,
            reconnect,
            commands: commands_rx,
            state: state_tx,
            registry: HashMap::new(),
            failures: 0,
        };
        let task = tokio::spawn(task.run());

        Self {
            url,
            handle: ConsumerHandle {
                commands: commands_tx,
            },
            state: state_rx,
            _task: task,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn handle(&self) -> ConsumerHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the server has welcomed the socket.
    pub async fn wait_until_open(&self) -> Result<(), ChannelError> {
        let mut state = self.state.clone();
        let reached = state
            .wait_for(|s| matches!(s, ConnectionState::Open | ConnectionState::Closed))
            .await
            .map_err(|_| ChannelError::Closed)?;
        match *reached {
            ConnectionState::Open => Ok(()),
            _ => Err(ChannelError::Closed),
        }
    }

    /// Subscribe a raw handler to `identifier`. Returns the wire identifier
    /// that frames will be routed by.
    pub fn subscribe(
        &self,
        identifier: &ChannelIdentifier,
        handler: Arc<dyn ChannelHandler>,
    ) -> Result<String, ChannelError> {
        let wire = identifier.to_wire();
        self.handle.subscribe(wire.clone(), handler)?;
        Ok(wire)
    }

    /// Close the socket and stop reconnecting. Every registered handler sees
    /// `disconnected(false)`.
    pub fn disconnect(&self) {
        let _ = self.handle.commands.send(ConsumerCommand::Disconnect);
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .finish()
    }
}

struct Registration {
    handler: Arc<dyn ChannelHandler>,
    confirmed: bool,
}

/// Why a single connection ended.
enum SessionEnd {
    Shutdown,
    Lost(String),
    ServerDisconnect { reconnect: bool },
}

struct ConnectionTask {
    url: Url,
    transport: Arc<dyn Transport>,
    reconnect: ReconnectConfig,
    commands: mpsc::UnboundedReceiver<ConsumerCommand>,
    state: watch::Sender<ConnectionState>,
    registry: HashMap<String, Registration>,
    /// Consecutive failures since the last welcome.
    failures: u32,
}

impl ConnectionTask {
    async fn run(mut self) {
        loop {
            let (end, welcomed) = match self.transport.connect(&self.url).await {
                Ok(connection) => {
                    debug!(host = ?self.url.host_str(), "Cable transport connected");
                    self.run_session(connection).await
                }
                Err(e) => (SessionEnd::Lost(e.to_string()), false),
            };

            let will_reconnect = match end {
                SessionEnd::Shutdown => {
                    info!("Cable consumer disconnected");
                    false
                }
                SessionEnd::Lost(reason) => {
                    self.failures += 1;
                    warn!(failures = self.failures, "Cable connection lost: {}", reason);
                    self.reconnect.allows_attempt(self.failures)
                }
                SessionEnd::ServerDisconnect { reconnect } => {
                    self.failures += 1;
                    reconnect && self.reconnect.allows_attempt(self.failures)
                }
            };

            // Channels never saw a connection if the server never welcomed
            // it; they stay pending until a welcome or until we give up.
            if welcomed || !will_reconnect {
                self.notify_disconnected(will_reconnect);
            }
            if !will_reconnect {
                break;
            }

            let _ = self.state.send(ConnectionState::Reconnecting {
                attempt: self.failures,
            });
            let delay = self.reconnect.delay_for(self.failures);
            debug!(?delay, attempt = self.failures, "Reconnecting cable");
            if !self.wait_backoff(delay).await {
                info!("Cable consumer disconnected while waiting to reconnect");
                self.notify_disconnected(false);
                break;
            }
            let _ = self.state.send(ConnectionState::Connecting);
        }

        self.registry.clear();
        let _ = self.state.send(ConnectionState::Closed);
    }

    /// Drive one socket until it ends. Also reports whether the server
    /// welcomed it.
    async fn run_session(&mut self, connection: TransportConnection) -> (SessionEnd, bool) {
        let mut welcomed = false;
        let end = self.drive_session(connection, &mut welcomed).await;
        (end, welcomed)
    }

    async fn drive_session(
        &mut self,
        connection: TransportConnection,
        welcomed: &mut bool,
    ) -> SessionEnd {
        let TransportConnection {
            mut sink,
            mut stream,
        } = connection;
        let stale_after = self.reconnect.stale_threshold();
        let mut last_seen = Instant::now();

        loop {
            let stale_deadline = stale_after.map(|after| last_seen + after);

            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        let _ = sink.close().await;
                        return SessionEnd::Shutdown;
                    };
                    if matches!(command, ConsumerCommand::Disconnect) {
                        let _ = sink.close().await;
                        return SessionEnd::Shutdown;
                    }
                    if let Err(e) = self.handle_command(command, *welcomed, &mut sink).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }

                frame = stream.next() => match frame {
                    Some(Ok(text)) => {
                        last_seen = Instant::now();
                        match self.handle_frame(&text, welcomed, &mut sink).await {
                            Ok(None) => {}
                            Ok(Some(end)) => {
                                let _ = sink.close().await;
                                return end;
                            }
                            Err(e) => return SessionEnd::Lost(e.to_string()),
                        }
                    }
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    None => return SessionEnd::Lost("connection closed by server".to_string()),
                },

                _ = sleep_until(stale_deadline) => {
                    return SessionEnd::Lost(format!(
                        "no traffic for {:?}, connection is stale",
                        stale_after.unwrap_or_default()
                    ));
                }
            }
        }
    }

    async fn handle_command(
        &mut self,
        command: ConsumerCommand,
        welcomed: bool,
        sink: &mut FrameSink,
    ) -> Result<(), ChannelError> {
        match command {
            ConsumerCommand::Subscribe {
                identifier,
                handler,
            } => {
                if self.registry.contains_key(&identifier) {
                    warn!(%identifier, "Identifier already registered, replacing handler");
                }
                self.registry.insert(
                    identifier.clone(),
                    Registration {
                        handler,
                        confirmed: false,
                    },
                );
                if welcomed {
                    send(sink, &ClientCommand::subscribe(identifier)).await?;
                }
            }
            ConsumerCommand::Unsubscribe { identifier } => {
                if self.registry.remove(&identifier).is_some() && welcomed {
                    send(sink, &ClientCommand::unsubscribe(identifier)).await?;
                }
            }
            ConsumerCommand::Send(command) => {
                let active = welcomed
                    && self
                        .registry
                        .get(command.identifier())
                        .is_some_and(|registration| registration.confirmed);
                if active {
                    send(sink, &command).await?;
                } else {
                    debug!(identifier = %command.identifier(), "Dropping command for inactive subscription");
                }
            }
            ConsumerCommand::Disconnect => {}
        }
        Ok(())
    }

    async fn handle_frame(
        &mut self,
        text: &str,
        welcomed: &mut bool,
        sink: &mut FrameSink,
    ) -> Result<Option<SessionEnd>, ChannelError> {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring unparseable cable message: {}", e);
                return Ok(None);
            }
        };

        match message {
            ServerMessage::Welcome => {
                *welcomed = true;
                self.failures = 0;
                let _ = self.state.send(ConnectionState::Open);
                info!(subscriptions = self.registry.len(), "Cable connection open");

                let identifiers: Vec<String> = self.registry.keys().cloned().collect();
                for identifier in identifiers {
                    send(sink, &ClientCommand::subscribe(identifier)).await?;
                }
            }
            ServerMessage::Ping(_) => trace!("Cable ping"),
            ServerMessage::ConfirmSubscription { identifier } => {
                let handler = match self.registry.get_mut(&identifier) {
                    Some(registration) if !registration.confirmed => {
                        registration.confirmed = true;
                        Some(registration.handler.clone())
                    }
                    Some(_) => None,
                    None => {
                        debug!(%identifier, "Confirmation for unknown subscription");
                        None
                    }
                };
                if let Some(handler) = handler {
                    debug!(%identifier, "Subscription confirmed");
                    handler.connected();
                }
            }
            ServerMessage::RejectSubscription { identifier } => {
                if let Some(registration) = self.registry.remove(&identifier) {
                    warn!(%identifier, "Subscription rejected");
                    registration.handler.rejected();
                }
            }
            ServerMessage::Disconnect { reason, reconnect } => {
                info!(?reason, reconnect, "Server requested disconnect");
                return Ok(Some(SessionEnd::ServerDisconnect { reconnect }));
            }
            ServerMessage::Message {
                identifier,
                message,
            } => {
                let handler = self
                    .registry
                    .get(&identifier)
                    .filter(|registration| registration.confirmed)
                    .map(|registration| registration.handler.clone());
                match handler {
                    Some(handler) => handler.received(message),
                    None => debug!(%identifier, "Dropping frame for inactive subscription"),
                }
            }
        }

        Ok(None)
    }

    /// Sleep out the backoff while still accepting registrations. Returns
    /// `false` if the consumer was shut down meanwhile.
    async fn wait_backoff(&mut self, delay: std::time::Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    None | Some(ConsumerCommand::Disconnect) => return false,
                    Some(ConsumerCommand::Subscribe { identifier, handler }) => {
                        self.registry.insert(identifier, Registration { handler, confirmed: false });
                    }
                    Some(ConsumerCommand::Unsubscribe { identifier }) => {
                        self.registry.remove(&identifier);
                    }
                    Some(ConsumerCommand::Send(command)) => {
                        debug!(identifier = %command.identifier(), "Dropping command while reconnecting");
                    }
                },
            }
        }
    }

    fn notify_disconnected(&mut self, will_reconnect: bool) {
        let handlers: Vec<Arc<dyn ChannelHandler>> = self
            .registry
            .values_mut()
            .map(|registration| {
                registration.confirmed = false;
                registration.handler.clone()
            })
            .collect();
        if !will_reconnect {
            self.registry.clear();
        }
        for handler in handlers {
            handler.disconnected(will_reconnect);
        }
    }
}

async fn send(sink: &mut FrameSink, command: &ClientCommand) -> Result<(), ChannelError> {
    let text = command.to_json()?;
    trace!("Cable send: {}", text);
    sink.send(text).await
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
