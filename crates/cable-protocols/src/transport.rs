//! Transport protocol definitions.
//!
//! A transport turns an endpoint URL into a pair of text-frame halves. The
//! consumer owns both halves for the lifetime of one connection.

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::Sink;
use url::Url;

use crate::error::ChannelError;

/// Outbound half: accepts serialized client commands.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = ChannelError> + Send>>;

/// Inbound half: yields raw text frames until the connection ends.
pub type FrameStream = BoxStream<'static, Result<String, ChannelError>>;

/// One open connection.
pub struct TransportConnection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl TransportConnection {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl std::fmt::Debug for TransportConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConnection").finish_non_exhaustive()
    }
}

/// Opens connections to a cable endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<TransportConnection, ChannelError>;
}
