//! Transport implementations.

pub mod memory;
pub mod websocket;

pub use memory::{MemoryConnection, MemoryServer, MemoryTransport};
pub use websocket::{WebSocketTransport, ACTIONCABLE_SUBPROTOCOL};
