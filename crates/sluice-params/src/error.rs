//! Error types for parameter declaration and validation.

use serde_json::Value;
use thiserror::Error;

use crate::connection::ConnectionDoesNotExist;

/// Errors raised when a parameter declaration is malformed.
///
/// These are load-time errors: a pipeline carrying an invalid declaration
/// never becomes runnable.
#[derive(Debug, Error)]
pub enum ParameterDeclarationError {
  /// The code does not match `^[a-z_][a-z_0-9]+$`.
  #[error("invalid parameter code '{code}'")]
  InvalidCode { code: String },

  /// A choice list was declared but is empty.
  #[error("parameter '{code}' declares an empty choice list")]
  EmptyChoices { code: String },

  /// The parameter type does not accept a choice list.
  #[error("parameter type '{spec_type}' does not accept choices")]
  ChoicesNotSupported { code: String, spec_type: &'static str },

  /// The parameter type does not accept multiple values.
  #[error("parameter type '{spec_type}' does not accept multiple values")]
  MultipleNotSupported { code: String, spec_type: &'static str },

  /// A declared choice does not satisfy the parameter type.
  #[error("invalid choice for parameter '{code}': {source}")]
  InvalidChoice {
    code: String,
    #[source]
    source: ParameterValueError,
  },

  /// The declared default does not satisfy the parameter type or choices.
  #[error("invalid default for parameter '{code}': {source}")]
  InvalidDefault {
    code: String,
    #[source]
    source: ParameterValueError,
  },
}

/// Errors raised while validating a run configuration.
///
/// Connection resolution failures are folded into this taxonomy so callers
/// see a single kind of configuration error.
#[derive(Debug, Error)]
pub enum ParameterValueError {
  /// A required parameter is missing, or its value normalized to nothing.
  #[error("{code} is required")]
  Required { code: String },

  /// The supplied value does not have the declared native shape.
  #[error("invalid value for '{code}': expected {expected}")]
  TypeMismatch { code: String, expected: &'static str },

  /// The supplied value is not one of the declared choices.
  #[error("value {value} for '{code}' is not an accepted choice")]
  NotAChoice { code: String, value: Value },

  /// A multiple-valued parameter was supplied with a non-list value.
  #[error("'{code}' expects a list of values")]
  ExpectedList { code: String },

  /// The configuration carries keys no declared parameter claims.
  #[error("unknown configuration keys: {}", .keys.join(", "))]
  UnknownKeys { keys: Vec<String> },

  /// A connection identifier could not be resolved.
  #[error("could not resolve connection '{identifier}' for '{code}': {source}")]
  ConnectionResolution {
    code: String,
    identifier: String,
    #[source]
    source: ConnectionDoesNotExist,
  },
}
