//! Run configuration validation.

use serde_json::{Map, Value};

use crate::connection::ConnectionResolver;
use crate::error::ParameterValueError;
use crate::parameter::Parameter;

/// A run configuration: parameter code → supplied value.
pub type RunConfig = Map<String, Value>;

/// Validate a raw run configuration against the declared parameters.
///
/// Produces the mapping the pipeline body is invoked with. Fails fast on
/// the first violation. Keys left over after every declared parameter has
/// been extracted are unrecognized configuration and reject the whole
/// invocation.
pub fn validate_config(
  parameters: &[Parameter],
  raw: RunConfig,
  resolver: &dyn ConnectionResolver,
) -> Result<RunConfig, ParameterValueError> {
  let mut remaining = raw;
  let mut validated = RunConfig::new();

  for parameter in parameters {
    let supplied = remaining.remove(parameter.code()).unwrap_or(Value::Null);
    let value = parameter.validate_value(&supplied, resolver)?;
    validated.insert(parameter.code().to_string(), value);
  }

  if !remaining.is_empty() {
    let keys: Vec<String> = remaining.keys().cloned().collect();
    return Err(ParameterValueError::UnknownKeys { keys });
  }

  Ok(validated)
}
