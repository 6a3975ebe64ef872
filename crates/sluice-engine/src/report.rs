//! Run results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use sluice_pipeline::TaskGraph;

/// Record of one completed task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
  pub name: String,
  /// Position in the engine's dispatch order.
  pub dispatch_index: usize,
  pub result: Value,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

/// Result of a complete pipeline run.
///
/// A report exists only for successful runs: the body returned and every
/// declared task completed.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub run_id: String,
  pub tasks: Vec<TaskRecord>,
}

impl RunReport {
  /// Snapshot a fully resolved graph.
  pub(crate) fn from_graph(run_id: &str, graph: &TaskGraph) -> Self {
    let tasks = graph
      .tasks()
      .iter()
      .filter_map(|task| {
        Some(TaskRecord {
          name: task.name().to_string(),
          dispatch_index: task.dispatch_index()?,
          result: task.result().cloned()?,
          started_at: task.started_at()?,
          finished_at: task.finished_at()?,
        })
      })
      .collect();

    Self {
      run_id: run_id.to_string(),
      tasks,
    }
  }

  /// Look up a task record by name.
  pub fn task(&self, name: &str) -> Option<&TaskRecord> {
    self.tasks.iter().find(|task| task.name == name)
  }
}
