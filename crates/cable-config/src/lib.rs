//! # Cable Config
//!
//! Configuration management for the cable subscription bridge.
//!
//! Configuration is loaded once by the composition root and passed into the
//! consumer factory as a plain struct; nothing below reads the process
//! environment on its own.

mod error;
mod loader;
mod schema;
mod session;
mod validator;

pub use error::ConfigError;
pub use loader::{ConfigLoader, CABLE_ENDPOINT_ENV};
pub use schema::*;
pub use session::SessionIdentity;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
