//! In-process transport.
//!
//! [`MemoryTransport`] hands every connection to a paired [`MemoryServer`],
//! which plays the cable server side: it reads the client's commands and
//! pushes [`ServerMessage`]s back. Used by the tests and handy for driving a
//! consumer without a network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cable_protocols::{ChannelError, ClientCommand, ServerMessage, Transport, TransportConnection};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;
use url::Url;

/// Client half of an in-memory cable.
#[derive(Clone)]
pub struct MemoryTransport {
    connections: mpsc::UnboundedSender<MemoryConnection>,
    refuse: Arc<AtomicBool>,
}

/// Server half of an in-memory cable.
pub struct MemoryServer {
    connections: mpsc::UnboundedReceiver<MemoryConnection>,
    refuse: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn pair() -> (MemoryTransport, MemoryServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let refuse = Arc::new(AtomicBool::new(false));
        (
            MemoryTransport {
                connections: tx,
                refuse: refuse.clone(),
            },
            MemoryServer {
                connections: rx,
                refuse,
            },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, url: &Url) -> Result<TransportConnection, ChannelError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ChannelError::ConnectionFailed(
                "connection refused".to_string(),
            ));
        }

        let (client_tx, server_rx) = mpsc::unbounded_channel::<String>();
        let (server_tx, client_rx) = mpsc::unbounded_channel::<String>();

        self.connections
            .send(MemoryConnection {
                url: url.clone(),
                inbound: server_rx,
                outbound: server_tx,
            })
            .map_err(|_| ChannelError::ConnectionFailed("server is gone".to_string()))?;

        let sink = futures::sink::unfold(client_tx, |tx, text: String| async move {
            tx.send(text)
                .map_err(|_| ChannelError::SendFailed("peer closed".to_string()))?;
            Ok::<_, ChannelError>(tx)
        });
        let stream = futures::stream::unfold(client_rx, |mut rx| async move {
            rx.recv().await.map(|text| (Ok::<_, ChannelError>(text), rx))
        });

        Ok(TransportConnection::new(Box::pin(sink), stream.boxed()))
    }
}

impl MemoryServer {
    /// Wait for the next client connection.
    pub async fn accept(&mut self) -> Option<MemoryConnection> {
        self.connections.recv().await
    }

    /// Like [`accept`](Self::accept) but gives up after `wait`.
    pub async fn accept_within(&mut self, wait: Duration) -> Option<MemoryConnection> {
        tokio::time::timeout(wait, self.accept()).await.ok().flatten()
    }

    /// Make subsequent connection attempts fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

/// Server side of one accepted connection.
pub struct MemoryConnection {
    url: Url,
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

impl MemoryConnection {
    /// URL the client connected to, query string included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Push a message to the client. Returns `false` once the client is gone.
    pub fn send(&self, message: &ServerMessage) -> bool {
        self.send_raw(message.to_json())
    }

    /// Push an arbitrary text frame.
    pub fn send_raw(&self, text: impl Into<String>) -> bool {
        self.outbound.send(text.into()).is_ok()
    }

    pub fn welcome(&self) -> bool {
        self.send(&ServerMessage::Welcome)
    }

    pub fn confirm(&self, identifier: &str) -> bool {
        self.send(&ServerMessage::ConfirmSubscription {
            identifier: identifier.to_string(),
        })
    }

    pub fn reject(&self, identifier: &str) -> bool {
        self.send(&ServerMessage::RejectSubscription {
            identifier: identifier.to_string(),
        })
    }

    /// Push a channel frame.
    pub fn push(&self, identifier: &str, message: Value) -> bool {
        self.send(&ServerMessage::Message {
            identifier: identifier.to_string(),
            message,
        })
    }

    /// Wait for the next parseable client command.
    pub async fn recv_command(&mut self) -> Option<ClientCommand> {
        while let Some(text) = self.inbound.recv().await {
            match serde_json::from_str(&text) {
                Ok(command) => return Some(command),
                Err(e) => warn!("Unparseable client command {}: {}", text, e),
            }
        }
        None
    }

    /// Like [`recv_command`](Self::recv_command) but gives up after `wait`.
    pub async fn recv_command_within(&mut self, wait: Duration) -> Option<ClientCommand> {
        tokio::time::timeout(wait, self.recv_command()).await.ok().flatten()
    }

    /// Drop the connection; the client sees its stream end.
    pub fn close(self) {}
}
