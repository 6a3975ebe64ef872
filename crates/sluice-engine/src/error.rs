//! Run-level errors.

use thiserror::Error;

use sluice_params::ParameterValueError;
use sluice_pipeline::{BodyError, GraphError, TaskError};

use crate::pool::PoolError;

/// Errors a pipeline run can fail with.
///
/// Configuration problems surface before the body or any task executes;
/// task failures propagate after the engine stops dispatching further
/// work. In every case the worker pool is drained before the error is
/// returned to the caller.
#[derive(Debug, Error)]
pub enum RunError {
  /// The run configuration failed validation; nothing was executed.
  #[error("invalid run configuration: {0}")]
  Validation(#[from] ParameterValueError),

  /// The pipeline body failed while recording the task graph.
  #[error("pipeline body failed: {source}")]
  Body { source: BodyError },

  /// A task body failed; pending tasks were abandoned.
  #[error("task '{task}' failed: {source}")]
  TaskFailed {
    task: String,
    #[source]
    source: TaskError,
  },

  /// The recorded graph was inconsistent.
  #[error(transparent)]
  Graph(#[from] GraphError),

  /// The worker pool failed.
  #[error(transparent)]
  Pool(#[from] PoolError),
}
