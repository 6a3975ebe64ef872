//! Task graph nodes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Handle to a task declared on a [`TaskGraph`](crate::TaskGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef(pub(crate) usize);

impl TaskRef {
  /// Position of the task in declaration order.
  pub fn index(&self) -> usize {
    self.0
  }
}

/// A captured task argument: either a literal value or the future result
/// of another task.
#[derive(Debug, Clone)]
pub enum Argument {
  Literal(Value),
  Task(TaskRef),
}

impl From<Value> for Argument {
  fn from(value: Value) -> Self {
    Argument::Literal(value)
  }
}

impl From<TaskRef> for Argument {
  fn from(task: TaskRef) -> Self {
    Argument::Task(task)
  }
}

/// Resolved arguments handed to a task function: every task reference has
/// been replaced by the dependency's result, by value.
#[derive(Debug, Clone, Default)]
pub struct TaskArgs {
  pub positional: Vec<Value>,
  pub keyword: HashMap<String, Value>,
}

impl TaskArgs {
  /// Positional argument at `index`, if present.
  pub fn get(&self, index: usize) -> Option<&Value> {
    self.positional.get(index)
  }

  /// Keyword argument by name, if present.
  pub fn kwarg(&self, name: &str) -> Option<&Value> {
    self.keyword.get(name)
  }
}

/// Error returned by a task body.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TaskError {
  message: String,
  #[source]
  source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TaskError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      source: None,
    }
  }

  pub fn with_source(
    message: impl Into<String>,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
  ) -> Self {
    Self {
      message: message.into(),
      source: Some(source.into()),
    }
  }
}

/// A task compute function.
pub type TaskFn = Arc<dyn Fn(TaskArgs) -> Result<Value, TaskError> + Send + Sync>;

/// One unit of computation within a pipeline run.
///
/// Declared with its arguments captured; `Task`-typed arguments are the
/// graph edges. Run state (result, timestamps, the dispatch latch) is
/// written back by the engine as the run progresses.
pub struct Task {
  name: String,
  func: TaskFn,
  args: Vec<Argument>,
  kwargs: Vec<(String, Argument)>,
  result: Option<Value>,
  started_at: Option<DateTime<Utc>>,
  finished_at: Option<DateTime<Utc>>,
  pooled: bool,
  dispatch_index: Option<usize>,
}

impl Task {
  pub(crate) fn new(
    name: String,
    func: TaskFn,
    args: Vec<Argument>,
    kwargs: Vec<(String, Argument)>,
  ) -> Self {
    Self {
      name,
      func,
      args,
      kwargs,
      result: None,
      started_at: None,
      finished_at: None,
      pooled: false,
      dispatch_index: None,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The compute function, shareable with a worker.
  pub fn func(&self) -> TaskFn {
    Arc::clone(&self.func)
  }

  pub fn args(&self) -> &[Argument] {
    &self.args
  }

  pub fn kwargs(&self) -> &[(String, Argument)] {
    &self.kwargs
  }

  pub fn result(&self) -> Option<&Value> {
    self.result.as_ref()
  }

  pub fn started_at(&self) -> Option<DateTime<Utc>> {
    self.started_at
  }

  pub fn finished_at(&self) -> Option<DateTime<Utc>> {
    self.finished_at
  }

  /// Whether the task has been handed to a worker. One-way latch guarding
  /// against double dispatch.
  pub fn pooled(&self) -> bool {
    self.pooled
  }

  /// Position in the engine's dispatch order, once dispatched.
  pub fn dispatch_index(&self) -> Option<usize> {
    self.dispatch_index
  }

  pub fn is_completed(&self) -> bool {
    self.finished_at.is_some()
  }

  /// Task references among the captured arguments.
  pub fn dependencies(&self) -> impl Iterator<Item = TaskRef> + '_ {
    self
      .args
      .iter()
      .chain(self.kwargs.iter().map(|(_, argument)| argument))
      .filter_map(|argument| match argument {
        Argument::Task(task) => Some(*task),
        Argument::Literal(_) => None,
      })
  }

  pub(crate) fn set_pooled(&mut self, dispatch_index: usize) {
    self.pooled = true;
    self.dispatch_index = Some(dispatch_index);
  }

  pub(crate) fn set_completed(
    &mut self,
    result: Value,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
  ) {
    self.result = Some(result);
    self.started_at = Some(started_at);
    self.finished_at = Some(finished_at);
  }
}

impl fmt::Debug for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Task")
      .field("name", &self.name)
      .field("args", &self.args)
      .field("kwargs", &self.kwargs)
      .field("result", &self.result)
      .field("pooled", &self.pooled)
      .field("finished_at", &self.finished_at)
      .finish_non_exhaustive()
  }
}
