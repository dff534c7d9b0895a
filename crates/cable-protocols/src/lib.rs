//! # Cable Protocols
//!
//! Wire types and trait seams for running GraphQL subscriptions over an
//! ActionCable-style multiplexed channel connection.
//! Contains no I/O - see `cable-client` for the implementations.
//!
//! ## Core Traits
//!
//! - [`Transport`] - Opens one text-frame connection to a cable endpoint
//! - [`Link`] - One stage of a GraphQL request pipeline
//! - [`Observer`] - Receives `next` / `error` / `complete` for one subscription

pub mod error;
pub mod graphql;
pub mod identifier;
pub mod link;
pub mod message;
pub mod observer;
pub mod transport;

pub use error::{ChannelError, LinkError, ProtocolError, SubscriptionError};
pub use graphql::{DefinitionKind, Frame, FrameEvent, GraphqlRequest, Operation, OperationKind};
pub use identifier::{ChannelIdentifier, DEFAULT_CHANNEL};
pub use link::{Forward, Link, LinkChain, OperationStream};
pub use message::{ClientCommand, ServerMessage};
pub use observer::Observer;
pub use transport::{FrameSink, FrameStream, Transport, TransportConnection};
