//! The per-run task graph.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::task::{Argument, Task, TaskArgs, TaskError, TaskRef};

/// Errors raised while recording or resolving the task graph.
#[derive(Debug, Error)]
pub enum GraphError {
  /// An argument referenced a task that has not been declared.
  #[error("argument references unknown task (index {index})")]
  UnknownTaskRef { index: usize },

  /// A dependency's result was read before the dependency completed.
  #[error("dependency '{task}' has not completed")]
  UnresolvedDependency { task: String },
}

/// The dependency DAG recorded by one pipeline-body invocation.
///
/// Tasks are declared in order and an argument may only reference an
/// already-declared task, so the graph is acyclic by construction. The
/// graph is transient: the engine builds a fresh one for every run, which
/// is why results can never leak between runs.
#[derive(Debug, Default)]
pub struct TaskGraph {
  tasks: Vec<Task>,
}

impl TaskGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare a task, capturing its arguments.
  ///
  /// `Task`-typed arguments establish the dependency edges. References to
  /// tasks not declared on this graph are rejected, which keeps the graph
  /// acyclic. Declaring does not execute anything.
  pub fn declare<F>(
    &mut self,
    name: impl Into<String>,
    func: F,
    args: Vec<Argument>,
    kwargs: Vec<(String, Argument)>,
  ) -> Result<TaskRef, GraphError>
  where
    F: Fn(TaskArgs) -> Result<Value, TaskError> + Send + Sync + 'static,
  {
    for argument in args.iter().chain(kwargs.iter().map(|(_, a)| a)) {
      if let Argument::Task(TaskRef(index)) = argument
        && *index >= self.tasks.len()
      {
        return Err(GraphError::UnknownTaskRef { index: *index });
      }
    }

    self
      .tasks
      .push(Task::new(name.into(), Arc::new(func), args, kwargs));
    Ok(TaskRef(self.tasks.len() - 1))
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn get(&self, task: TaskRef) -> Option<&Task> {
    self.tasks.get(task.0)
  }

  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  /// Tasks whose every dependency has completed and which have not been
  /// dispatched, in declaration order.
  ///
  /// A task with no dependencies is ready immediately. Readiness is
  /// derived from the captured arguments; there is no separate edge list.
  pub fn ready(&self) -> Vec<TaskRef> {
    self
      .tasks
      .iter()
      .enumerate()
      .filter(|(_, task)| !task.pooled() && !task.is_completed())
      .filter(|(_, task)| task.dependencies().all(|dep| self.dep_completed(dep)))
      .map(|(index, _)| TaskRef(index))
      .collect()
  }

  fn dep_completed(&self, task: TaskRef) -> bool {
    self.tasks.get(task.0).is_some_and(Task::is_completed)
  }

  /// Replace task-typed arguments with their results, by value.
  pub fn resolve_args(&self, task: TaskRef) -> Result<TaskArgs, GraphError> {
    let Some(node) = self.tasks.get(task.0) else {
      return Err(GraphError::UnknownTaskRef { index: task.0 });
    };

    let mut resolved = TaskArgs::default();
    for argument in node.args() {
      resolved.positional.push(self.resolve_argument(argument)?);
    }
    for (key, argument) in node.kwargs() {
      resolved
        .keyword
        .insert(key.clone(), self.resolve_argument(argument)?);
    }
    Ok(resolved)
  }

  fn resolve_argument(&self, argument: &Argument) -> Result<Value, GraphError> {
    match argument {
      Argument::Literal(value) => Ok(value.clone()),
      Argument::Task(task) => {
        let Some(node) = self.tasks.get(task.0) else {
          return Err(GraphError::UnknownTaskRef { index: task.0 });
        };
        match node.result() {
          Some(value) if node.is_completed() => Ok(value.clone()),
          _ => Err(GraphError::UnresolvedDependency {
            task: node.name().to_string(),
          }),
        }
      }
    }
  }

  /// Latch a task as dispatched and record its dispatch position.
  pub fn mark_pooled(&mut self, task: TaskRef, dispatch_index: usize) {
    if let Some(node) = self.tasks.get_mut(task.0) {
      node.set_pooled(dispatch_index);
    }
  }

  /// Write a completed task's result and timestamps back into the node.
  pub fn complete(
    &mut self,
    task: TaskRef,
    result: Value,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
  ) {
    if let Some(node) = self.tasks.get_mut(task.0) {
      node.set_completed(result, started_at, finished_at);
    }
  }

  /// Whether every declared task has completed.
  pub fn is_resolved(&self) -> bool {
    self.tasks.iter().all(Task::is_completed)
  }
}
