//! # Cable Client
//!
//! Runtime side of the subscription bridge: a [`Consumer`] owning one socket,
//! [`ChannelSubscription`]s multiplexed over it, the [`GraphqlChannel`]
//! adapter and the [`CableLink`] / [`HttpLink`] pipeline stages.

pub mod channel;
pub mod consumer;
pub mod factory;
pub mod graphql;
pub mod http;
pub mod link;
pub mod transport;

pub use channel::{ChannelCallbacks, ChannelStatus, ChannelSubscription};
pub use consumer::{ChannelHandler, ConnectionState, Consumer, ConsumerHandle};
pub use factory::ConsumerFactory;
pub use graphql::{GraphqlChannel, EXECUTE_ACTION};
pub use http::HttpLink;
pub use link::{CableLink, SubscriptionStream};
pub use transport::{MemoryConnection, MemoryServer, MemoryTransport, WebSocketTransport};
