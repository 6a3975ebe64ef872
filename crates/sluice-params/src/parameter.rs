//! Pipeline parameter declarations.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::ConnectionResolver;
use crate::error::{ParameterDeclarationError, ParameterValueError};
use crate::types::ParameterType;

static CODE_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new("^[a-z_][a-z_0-9]+$").expect("parameter code pattern is valid"));

/// A typed, named input declared on a pipeline and supplied per run.
///
/// Immutable once built; every declaration invariant is enforced by
/// [`ParameterBuilder::build`]. Defaults and choices are stored normalized,
/// so membership checks compare like with like.
#[derive(Debug, Clone)]
pub struct Parameter {
  code: String,
  param_type: ParameterType,
  name: Option<String>,
  help: Option<String>,
  default: Option<Value>,
  choices: Option<Vec<Value>>,
  required: bool,
  multiple: bool,
}

impl Parameter {
  /// Start building a parameter with the given code and type.
  pub fn builder(code: impl Into<String>, param_type: ParameterType) -> ParameterBuilder {
    ParameterBuilder {
      code: code.into(),
      param_type,
      name: None,
      help: None,
      default: None,
      choices: None,
      required: true,
      multiple: false,
    }
  }

  pub fn code(&self) -> &str {
    &self.code
  }

  pub fn param_type(&self) -> ParameterType {
    self.param_type
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn help(&self) -> Option<&str> {
    self.help.as_deref()
  }

  pub fn default(&self) -> Option<&Value> {
    self.default.as_ref()
  }

  pub fn choices(&self) -> Option<&[Value]> {
    self.choices.as_deref()
  }

  pub fn required(&self) -> bool {
    self.required
  }

  pub fn multiple(&self) -> bool {
    self.multiple
  }

  /// Serializable projection of this declaration, as uploaded to a
  /// pipeline registry.
  pub fn spec(&self) -> ParameterSpec {
    ParameterSpec {
      code: self.code.clone(),
      spec_type: self.param_type.spec_type().to_string(),
      name: self.name.clone(),
      help: self.help.clone(),
      required: self.required,
      multiple: self.multiple,
      choices: self.choices.clone(),
      default: self.default.clone(),
    }
  }

  /// Validate the raw value supplied for this parameter in a run
  /// configuration.
  ///
  /// Applies normalization, default substitution, required and choice
  /// checks, then the type's own validation (which resolves connection
  /// references through `resolver`).
  pub fn validate_value(
    &self,
    raw: &Value,
    resolver: &dyn ConnectionResolver,
  ) -> Result<Value, ParameterValueError> {
    if self.multiple {
      self.validate_multiple(raw, resolver)
    } else {
      self.validate_single(raw, resolver)
    }
  }

  fn validate_single(
    &self,
    raw: &Value,
    resolver: &dyn ConnectionResolver,
  ) -> Result<Value, ParameterValueError> {
    let normalized = match self.param_type.normalize(raw) {
      Some(value) => Some(value),
      None => self.default.clone(),
    };

    let Some(value) = normalized else {
      if self.required {
        return Err(ParameterValueError::Required {
          code: self.code.clone(),
        });
      }
      // Optional and absent: the body still sees the declared code.
      return Ok(Value::Null);
    };

    let value = self.param_type.validate(&self.code, &value, resolver)?;
    self.check_choice(&value)?;
    Ok(value)
  }

  fn validate_multiple(
    &self,
    raw: &Value,
    resolver: &dyn ConnectionResolver,
  ) -> Result<Value, ParameterValueError> {
    let elements: Vec<Value> = match raw {
      Value::Null => Vec::new(),
      Value::Array(items) => items
        .iter()
        .filter_map(|item| self.param_type.normalize(item))
        .collect(),
      _ => {
        return Err(ParameterValueError::ExpectedList {
          code: self.code.clone(),
        });
      }
    };

    let elements = if elements.is_empty() {
      match &self.default {
        // Multiple-valued defaults are stored as arrays at build time.
        Some(Value::Array(defaults)) => defaults.clone(),
        _ => Vec::new(),
      }
    } else {
      elements
    };

    if elements.is_empty() && self.required {
      return Err(ParameterValueError::Required {
        code: self.code.clone(),
      });
    }

    let mut validated = Vec::with_capacity(elements.len());
    for element in &elements {
      let value = self.param_type.validate(&self.code, element, resolver)?;
      self.check_choice(&value)?;
      validated.push(value);
    }
    Ok(Value::Array(validated))
  }

  fn check_choice(&self, value: &Value) -> Result<(), ParameterValueError> {
    match &self.choices {
      Some(choices) if !choices.contains(value) => Err(ParameterValueError::NotAChoice {
        code: self.code.clone(),
        value: value.clone(),
      }),
      _ => Ok(()),
    }
  }
}

/// Serializable description of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
  pub code: String,
  #[serde(rename = "type")]
  pub spec_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub help: Option<String>,
  pub required: bool,
  pub multiple: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub choices: Option<Vec<Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<Value>,
}

/// Builder for [`Parameter`] declarations.
///
/// Parameters are required by default; `required(false)` makes them
/// optional.
#[derive(Debug)]
pub struct ParameterBuilder {
  code: String,
  param_type: ParameterType,
  name: Option<String>,
  help: Option<String>,
  default: Option<Value>,
  choices: Option<Vec<Value>>,
  required: bool,
  multiple: bool,
}

impl ParameterBuilder {
  /// Display name shown in user interfaces.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Help text shown next to the input.
  pub fn help(mut self, help: impl Into<String>) -> Self {
    self.help = Some(help.into());
    self
  }

  /// Value substituted when the supplied value normalizes to nothing.
  pub fn default(mut self, default: Value) -> Self {
    self.default = Some(default);
    self
  }

  /// Restrict accepted values to this list.
  pub fn choices(mut self, choices: Vec<Value>) -> Self {
    self.choices = Some(choices);
    self
  }

  pub fn required(mut self, required: bool) -> Self {
    self.required = required;
    self
  }

  /// Accept a list of values instead of a single one.
  pub fn multiple(mut self, multiple: bool) -> Self {
    self.multiple = multiple;
    self
  }

  /// Check every declaration invariant and produce the parameter.
  pub fn build(self) -> Result<Parameter, ParameterDeclarationError> {
    if !CODE_PATTERN.is_match(&self.code) {
      return Err(ParameterDeclarationError::InvalidCode { code: self.code });
    }

    if self.multiple && !self.param_type.accepts_multiple() {
      return Err(ParameterDeclarationError::MultipleNotSupported {
        code: self.code,
        spec_type: self.param_type.spec_type(),
      });
    }

    let choices = match self.choices {
      Some(choices) => {
        if !self.param_type.accepts_choice() {
          return Err(ParameterDeclarationError::ChoicesNotSupported {
            code: self.code,
            spec_type: self.param_type.spec_type(),
          });
        }
        if choices.is_empty() {
          return Err(ParameterDeclarationError::EmptyChoices { code: self.code });
        }

        let mut normalized = Vec::with_capacity(choices.len());
        for choice in &choices {
          let value = self
            .param_type
            .normalize(choice)
            .unwrap_or(Value::Null);
          let value = self
            .param_type
            .validate_shape(&self.code, &value)
            .map_err(|source| ParameterDeclarationError::InvalidChoice {
              code: self.code.clone(),
              source,
            })?;
          normalized.push(value);
        }
        Some(normalized)
      }
      None => None,
    };

    let default = match self.default {
      Some(raw) => Some(Self::check_default(
        &self.code,
        self.param_type,
        self.multiple,
        choices.as_deref(),
        raw,
      )?),
      None => None,
    };

    Ok(Parameter {
      code: self.code,
      param_type: self.param_type,
      name: self.name,
      help: self.help,
      default,
      choices,
      required: self.required,
      multiple: self.multiple,
    })
  }

  /// Normalize and shape-check a declared default, including per-element
  /// checks and choice membership for multiple-valued parameters.
  fn check_default(
    code: &str,
    param_type: ParameterType,
    multiple: bool,
    choices: Option<&[Value]>,
    raw: Value,
  ) -> Result<Value, ParameterDeclarationError> {
    let invalid = |source| ParameterDeclarationError::InvalidDefault {
      code: code.to_string(),
      source,
    };

    let check_one = |value: &Value| -> Result<Value, ParameterValueError> {
      let value = param_type.normalize(value).unwrap_or(Value::Null);
      let value = param_type.validate_shape(code, &value)?;
      if let Some(choices) = choices
        && !choices.contains(&value)
      {
        return Err(ParameterValueError::NotAChoice {
          code: code.to_string(),
          value,
        });
      }
      Ok(value)
    };

    if multiple {
      let Value::Array(items) = raw else {
        return Err(invalid(ParameterValueError::ExpectedList {
          code: code.to_string(),
        }));
      };
      let mut validated = Vec::with_capacity(items.len());
      for item in &items {
        validated.push(check_one(item).map_err(invalid)?);
      }
      Ok(Value::Array(validated))
    } else {
      check_one(&raw).map_err(invalid)
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::connection::StaticConnectionResolver;

  fn resolver() -> StaticConnectionResolver {
    StaticConnectionResolver::new()
  }

  #[test]
  fn build_rejects_invalid_codes() {
    for code in ["Count", "1count", "with space", "x"] {
      let err = Parameter::builder(code, ParameterType::Integer)
        .build()
        .unwrap_err();
      assert!(matches!(
        err,
        ParameterDeclarationError::InvalidCode { .. }
      ));
    }
  }

  #[test]
  fn build_rejects_choices_on_boolean() {
    let err = Parameter::builder("flag", ParameterType::Boolean)
      .choices(vec![json!(true)])
      .build()
      .unwrap_err();
    assert!(matches!(
      err,
      ParameterDeclarationError::ChoicesNotSupported { .. }
    ));
  }

  #[test]
  fn build_rejects_empty_choices() {
    let err = Parameter::builder("level", ParameterType::String)
      .choices(vec![])
      .build()
      .unwrap_err();
    assert!(matches!(err, ParameterDeclarationError::EmptyChoices { .. }));
  }

  #[test]
  fn build_rejects_multiple_on_boolean() {
    let err = Parameter::builder("flags", ParameterType::Boolean)
      .multiple(true)
      .build()
      .unwrap_err();
    assert!(matches!(
      err,
      ParameterDeclarationError::MultipleNotSupported { .. }
    ));
  }

  #[test]
  fn build_rejects_mistyped_default() {
    let err = Parameter::builder("count", ParameterType::Integer)
      .default(json!("five"))
      .build()
      .unwrap_err();
    assert!(matches!(
      err,
      ParameterDeclarationError::InvalidDefault { .. }
    ));
  }

  #[test]
  fn build_rejects_default_outside_choices() {
    let err = Parameter::builder("level", ParameterType::String)
      .choices(vec![json!("a"), json!("b")])
      .default(json!("c"))
      .build()
      .unwrap_err();
    assert!(matches!(
      err,
      ParameterDeclarationError::InvalidDefault { .. }
    ));
  }

  #[test]
  fn build_rejects_mistyped_choice() {
    let err = Parameter::builder("level", ParameterType::String)
      .choices(vec![json!("a"), json!(2)])
      .build()
      .unwrap_err();
    assert!(matches!(
      err,
      ParameterDeclarationError::InvalidChoice { .. }
    ));
  }

  #[test]
  fn default_substitutes_missing_value() {
    let parameter = Parameter::builder("count", ParameterType::Integer)
      .default(json!(5))
      .build()
      .unwrap();

    let value = parameter.validate_value(&Value::Null, &resolver()).unwrap();
    assert_eq!(value, json!(5));
  }

  #[test]
  fn required_without_default_fails_on_empty() {
    let parameter = Parameter::builder("name", ParameterType::String)
      .build()
      .unwrap();

    let err = parameter
      .validate_value(&json!(""), &resolver())
      .unwrap_err();
    assert_eq!(err.to_string(), "name is required");
  }

  #[test]
  fn optional_missing_value_validates_to_null() {
    let parameter = Parameter::builder("note", ParameterType::String)
      .required(false)
      .build()
      .unwrap();

    let value = parameter.validate_value(&Value::Null, &resolver()).unwrap();
    assert_eq!(value, Value::Null);
  }

  #[test]
  fn choice_members_validate_to_themselves() {
    let parameter = Parameter::builder("level", ParameterType::String)
      .choices(vec![json!("a"), json!("b")])
      .build()
      .unwrap();

    assert_eq!(
      parameter.validate_value(&json!("a"), &resolver()).unwrap(),
      json!("a")
    );
    let err = parameter
      .validate_value(&json!("z"), &resolver())
      .unwrap_err();
    assert!(matches!(err, ParameterValueError::NotAChoice { .. }));
  }

  #[test]
  fn multiple_rejects_non_list() {
    let parameter = Parameter::builder("levels", ParameterType::String)
      .multiple(true)
      .build()
      .unwrap();

    let err = parameter
      .validate_value(&json!("a"), &resolver())
      .unwrap_err();
    assert!(matches!(err, ParameterValueError::ExpectedList { .. }));
  }

  #[test]
  fn multiple_drops_empty_elements_and_checks_choices() {
    let parameter = Parameter::builder("levels", ParameterType::String)
      .choices(vec![json!("a"), json!("b")])
      .multiple(true)
      .build()
      .unwrap();

    assert_eq!(
      parameter
        .validate_value(&json!(["a", "", "b"]), &resolver())
        .unwrap(),
      json!(["a", "b"])
    );

    let err = parameter
      .validate_value(&json!(["a", "c"]), &resolver())
      .unwrap_err();
    assert!(matches!(err, ParameterValueError::NotAChoice { .. }));
  }

  #[test]
  fn multiple_falls_back_to_default_then_required() {
    let with_default = Parameter::builder("levels", ParameterType::String)
      .multiple(true)
      .default(json!(["a"]))
      .build()
      .unwrap();
    assert_eq!(
      with_default
        .validate_value(&json!([]), &resolver())
        .unwrap(),
      json!(["a"])
    );

    let without_default = Parameter::builder("levels", ParameterType::String)
      .multiple(true)
      .build()
      .unwrap();
    let err = without_default
      .validate_value(&json!([""]), &resolver())
      .unwrap_err();
    assert!(matches!(err, ParameterValueError::Required { .. }));
  }

  #[test]
  fn spec_round_trips_defaults_and_choices() {
    let parameter = Parameter::builder("level", ParameterType::String)
      .name("Level")
      .help("Aggregation level")
      .choices(vec![json!("a"), json!("b")])
      .default(json!("a"))
      .build()
      .unwrap();

    let spec = parameter.spec();
    assert_eq!(spec.spec_type, "str");

    // Everything the spec advertises re-validates against its own
    // declaration.
    for choice in spec.choices.as_deref().unwrap_or(&[]) {
      assert!(parameter.validate_value(choice, &resolver()).is_ok());
    }
    let default = spec.default.clone().unwrap();
    assert_eq!(
      parameter.validate_value(&default, &resolver()).unwrap(),
      default
    );
  }
}
