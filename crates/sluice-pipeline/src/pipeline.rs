//! Pipeline declarations.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;

use sluice_params::{Parameter, ParameterSpec, RunConfig};

use crate::graph::TaskGraph;

static CODE_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new("^[a-z0-9_-]+$").expect("pipeline code pattern is valid"));

/// Error a pipeline body may fail with.
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// The pipeline body: invoked with a fresh task graph and the validated
/// run configuration, it records tasks via [`TaskGraph::declare`].
pub type PipelineBody =
  Arc<dyn Fn(&mut TaskGraph, &RunConfig) -> Result<(), BodyError> + Send + Sync>;

/// Errors raised while defining a pipeline.
#[derive(Debug, Error)]
pub enum PipelineDefinitionError {
  /// The code does not match `^[a-z0-9_-]+$`.
  #[error("invalid pipeline code '{code}'")]
  InvalidCode { code: String },

  /// Two parameters share a code.
  #[error("duplicate parameter code '{code}'")]
  DuplicateParameter { code: String },

  /// No body was supplied.
  #[error("pipeline '{code}' has no body")]
  MissingBody { code: String },
}

/// A named unit of work: a parameter contract plus a body that records a
/// task graph.
///
/// Built once via [`PipelineBuilder`]. The pipeline itself holds no run
/// state; the task graph is transient per run and owned by the engine.
#[derive(Clone)]
pub struct Pipeline {
  code: String,
  name: String,
  parameters: Vec<Parameter>,
  body: PipelineBody,
}

impl Pipeline {
  /// Start defining a pipeline with the given code slug and display name.
  pub fn builder(code: impl Into<String>, name: impl Into<String>) -> PipelineBuilder {
    PipelineBuilder {
      code: code.into(),
      name: name.into(),
      parameters: Vec::new(),
      body: None,
    }
  }

  pub fn code(&self) -> &str {
    &self.code
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Declared parameters, in declaration order.
  pub fn parameters(&self) -> &[Parameter] {
    &self.parameters
  }

  pub fn body(&self) -> PipelineBody {
    Arc::clone(&self.body)
  }

  /// Pure serialization of the parameter list, used to upload pipeline
  /// metadata to a registry.
  pub fn parameter_specs(&self) -> Vec<ParameterSpec> {
    self.parameters.iter().map(Parameter::spec).collect()
  }
}

impl fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pipeline")
      .field("code", &self.code)
      .field("name", &self.name)
      .field("parameters", &self.parameters)
      .finish_non_exhaustive()
  }
}

/// Builder for [`Pipeline`] declarations.
pub struct PipelineBuilder {
  code: String,
  name: String,
  parameters: Vec<Parameter>,
  body: Option<PipelineBody>,
}

impl PipelineBuilder {
  /// Declare a parameter. Order is preserved.
  pub fn parameter(mut self, parameter: Parameter) -> Self {
    self.parameters.push(parameter);
    self
  }

  /// Supply the pipeline body.
  pub fn body<F>(mut self, body: F) -> Self
  where
    F: Fn(&mut TaskGraph, &RunConfig) -> Result<(), BodyError> + Send + Sync + 'static,
  {
    self.body = Some(Arc::new(body));
    self
  }

  /// Check the definition invariants and produce the pipeline.
  pub fn build(self) -> Result<Pipeline, PipelineDefinitionError> {
    if !CODE_PATTERN.is_match(&self.code) {
      return Err(PipelineDefinitionError::InvalidCode { code: self.code });
    }

    let mut seen = HashSet::new();
    for parameter in &self.parameters {
      if !seen.insert(parameter.code()) {
        return Err(PipelineDefinitionError::DuplicateParameter {
          code: parameter.code().to_string(),
        });
      }
    }

    let Some(body) = self.body else {
      return Err(PipelineDefinitionError::MissingBody { code: self.code });
    };

    Ok(Pipeline {
      code: self.code,
      name: self.name,
      parameters: self.parameters,
      body,
    })
  }
}
