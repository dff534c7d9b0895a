//! Error types for the cable protocol layer.

mod channel;
mod link;
mod protocol;
mod subscription;

pub use channel::*;
pub use link::*;
pub use protocol::*;
pub use subscription::*;
