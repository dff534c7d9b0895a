//! WebSocket transport over tokio-tungstenite.

use async_trait::async_trait;
use cable_protocols::{ChannelError, Transport, TransportConnection};
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{ORIGIN, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};
use url::Url;

/// Subprotocol ActionCable servers negotiate for JSON framing.
pub const ACTIONCABLE_SUBPROTOCOL: &str = "actioncable-v1-json";

/// Connects to cable endpoints with a real WebSocket.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    origin: Option<String>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send an `Origin` header with the upgrade request. Servers that check
    /// allowed origins refuse the handshake without one.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &Url) -> Result<TransportConnection, ChannelError> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(ACTIONCABLE_SUBPROTOCOL),
        );
        if let Some(origin) = &self.origin {
            let value = HeaderValue::from_str(origin)
                .map_err(|e| ChannelError::ConnectionFailed(format!("invalid origin: {}", e)))?;
            headers.insert(ORIGIN, value);
        }

        let (socket, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        let (sink, source) = socket.split();

        let sink = sink
            .sink_map_err(|e| ChannelError::SendFailed(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, ChannelError>(Message::Text(text.into()))));

        let stream = source.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes.to_vec()).ok().map(Ok),
                Ok(Message::Close(frame)) => {
                    trace!(?frame, "WebSocket close frame");
                    Some(Err(ChannelError::Disconnected))
                }
                Ok(_) => None,
                Err(e) => Some(Err(ChannelError::ReceiveFailed(e.to_string()))),
            })
        });

        Ok(TransportConnection::new(Box::pin(sink), stream.boxed()))
    }
}
