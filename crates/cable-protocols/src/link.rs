//! Request pipeline ("link") protocol.
//!
//! A link either answers an operation itself or passes it to the rest of the
//! chain through [`Forward`]. Results come back as a stream: one item for
//! queries and mutations, many for subscriptions.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use crate::error::LinkError;
use crate::graphql::Operation;

/// Results of one operation.
pub type OperationStream = BoxStream<'static, Result<Value, LinkError>>;

/// One stage of a request pipeline.
pub trait Link: Send + Sync {
    fn request(&self, operation: Operation, forward: Forward<'_>) -> OperationStream;
}

/// The remainder of a chain after the current link.
#[derive(Clone, Copy)]
pub struct Forward<'a> {
    rest: &'a [Arc<dyn Link>],
}

impl<'a> Forward<'a> {
    pub fn new(rest: &'a [Arc<dyn Link>]) -> Self {
        Self { rest }
    }

    /// Nothing left to forward to.
    pub fn terminal() -> Forward<'static> {
        Forward { rest: &[] }
    }

    pub fn is_terminal(&self) -> bool {
        self.rest.is_empty()
    }

    /// Hand the operation to the next link.
    pub fn call(self, operation: Operation) -> OperationStream {
        match self.rest.split_first() {
            Some((next, rest)) => next.request(operation, Forward { rest }),
            None => stream::iter([Err(LinkError::NoForward)]).boxed(),
        }
    }
}

/// An ordered list of links, first link first.
#[derive(Clone, Default)]
pub struct LinkChain {
    links: Vec<Arc<dyn Link>>,
}

impl LinkChain {
    pub fn new(links: Vec<Arc<dyn Link>>) -> Self {
        Self { links }
    }

    pub fn push(mut self, link: Arc<dyn Link>) -> Self {
        self.links.push(link);
        self
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Run an operation through the whole chain.
    pub fn execute(&self, operation: impl Into<Operation>) -> OperationStream {
        Forward::new(&self.links).call(operation.into())
    }
}
