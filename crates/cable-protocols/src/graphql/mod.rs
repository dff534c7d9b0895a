//! GraphQL operations and subscription frames.

mod document;
mod frame;
mod request;

pub use document::{definitions, has_subscription, DefinitionKind, OperationKind};
pub use frame::{Frame, FrameEvent};
pub use request::{GraphqlRequest, Operation};
