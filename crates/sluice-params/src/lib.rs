//! Parameter contracts for sluice pipelines.
//!
//! This crate holds the declarative side of the SDK:
//! - [`ParameterType`] strategies that normalize and validate raw values
//! - [`Parameter`] declarations with load-time invariant checks
//! - the connection model and its resolvers
//! - [`validate_config`], which turns a raw run configuration into the
//!   validated mapping a pipeline body is invoked with
//!
//! Validation is deterministic and side-effect free, with one stated
//! exception: connection-typed parameters resolve their identifier through
//! a [`ConnectionResolver`] collaborator.

mod config;
mod connection;
mod error;
mod parameter;
mod types;

pub use config::{RunConfig, validate_config};
pub use connection::{
  Connection, ConnectionDoesNotExist, ConnectionKind, ConnectionResolver, EnvConnectionResolver,
  StaticConnectionResolver,
};
pub use error::{ParameterDeclarationError, ParameterValueError};
pub use parameter::{Parameter, ParameterBuilder, ParameterSpec};
pub use types::ParameterType;
