//! Parameter type strategies.
//!
//! Each pipeline parameter declares a [`ParameterType`] which knows how to
//! normalize a raw configuration value, check its native shape, and resolve
//! connection references through a resolver collaborator.

use serde_json::Value;

use crate::connection::{ConnectionKind, ConnectionResolver};
use crate::error::ParameterValueError;

/// The type of a pipeline parameter.
///
/// Stateless strategy: all operations take the value they act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
  String,
  Boolean,
  Integer,
  Float,
  Connection(ConnectionKind),
}

impl ParameterType {
  /// Wire-format type tag used in parameter specs.
  pub fn spec_type(&self) -> &'static str {
    match self {
      ParameterType::String => "str",
      ParameterType::Boolean => "bool",
      ParameterType::Integer => "int",
      ParameterType::Float => "float",
      ParameterType::Connection(kind) => kind.spec_type(),
    }
  }

  /// Human name of the native shape, used in type mismatch messages.
  pub fn expected(&self) -> &'static str {
    match self {
      ParameterType::String => "a string",
      ParameterType::Boolean => "a boolean",
      ParameterType::Integer => "an integer",
      ParameterType::Float => "a number",
      ParameterType::Connection(_) => "a connection identifier string",
    }
  }

  /// Whether parameters of this type may declare a choice list.
  pub fn accepts_choice(&self) -> bool {
    matches!(
      self,
      ParameterType::String | ParameterType::Integer | ParameterType::Float
    )
  }

  /// Whether parameters of this type may accept multiple values.
  pub fn accepts_multiple(&self) -> bool {
    matches!(
      self,
      ParameterType::String | ParameterType::Integer | ParameterType::Float
    )
  }

  /// Normalize a raw configuration value.
  ///
  /// Empty representations (JSON null, empty or whitespace-only strings)
  /// become `None`. Strings are trimmed. Integers are coerced to floats for
  /// the float type. Idempotent: normalizing a normalized value returns it
  /// unchanged.
  pub fn normalize(&self, value: &Value) -> Option<Value> {
    let value = match value {
      Value::Null => return None,
      Value::String(s) => {
        let trimmed = s.trim();
        if trimmed.is_empty() {
          return None;
        }
        Value::String(trimmed.to_string())
      }
      other => other.clone(),
    };

    match self {
      ParameterType::Float => match value.as_i64() {
        Some(n) => Some(Value::from(n as f64)),
        None => Some(value),
      },
      _ => Some(value),
    }
  }

  /// Check the native shape of a normalized value.
  ///
  /// Pure: no connection resolution happens here, so declaration-time
  /// checks on defaults and choices can run without a resolver. Raises on
  /// mismatch, never returns a sentinel.
  pub fn validate_shape(&self, code: &str, value: &Value) -> Result<Value, ParameterValueError> {
    let ok = match self {
      ParameterType::String => value.is_string(),
      ParameterType::Boolean => value.is_boolean(),
      ParameterType::Integer => value.is_i64() || value.is_u64(),
      ParameterType::Float => value.is_number(),
      ParameterType::Connection(_) => value.as_str().is_some_and(|s| !s.trim().is_empty()),
    };

    if ok {
      Ok(value.clone())
    } else {
      Err(ParameterValueError::TypeMismatch {
        code: code.to_string(),
        expected: self.expected(),
      })
    }
  }

  /// Validate a normalized value, resolving connection references.
  ///
  /// For connection types the identifier is resolved through `resolver`
  /// and the resolved connection is returned serialized as a JSON object;
  /// a failed resolution is reported as a configuration error.
  pub fn validate(
    &self,
    code: &str,
    value: &Value,
    resolver: &dyn ConnectionResolver,
  ) -> Result<Value, ParameterValueError> {
    let value = self.validate_shape(code, value)?;

    match self {
      ParameterType::Connection(kind) => match value.as_str() {
        Some(identifier) => {
          let connection = resolver.resolve(*kind, identifier).map_err(|source| {
            ParameterValueError::ConnectionResolution {
              code: code.to_string(),
              identifier: identifier.to_string(),
              source,
            }
          })?;
          Ok(connection.to_value())
        }
        None => Err(ParameterValueError::TypeMismatch {
          code: code.to_string(),
          expected: self.expected(),
        }),
      },
      _ => Ok(value),
    }
  }
}
