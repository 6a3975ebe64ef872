//! Pipeline runner.
//!
//! Orchestrates one run: configuration validation, recording the task
//! graph by invoking the pipeline body, then the dispatch/poll loop that
//! drives the graph to completion on the worker pool.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};
use uuid::Uuid;

use sluice_params::{ConnectionResolver, EnvConnectionResolver, RunConfig, validate_config};
use sluice_pipeline::{GraphError, Pipeline, TaskGraph, TaskRef};

use crate::error::RunError;
use crate::pool::{Job, JobHandle, TokioWorkerPool, WorkerPool};
use crate::report::RunReport;

/// Default number of worker slots.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default pause between poll passes that made no progress.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
  /// Fixed worker pool size.
  pub max_workers: usize,
  /// Pause between poll passes that found nothing newly completed.
  pub poll_interval: Duration,
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      max_workers: DEFAULT_MAX_WORKERS,
      poll_interval: DEFAULT_POLL_INTERVAL,
    }
  }
}

/// Executes pipelines: validates configuration, records the task graph,
/// then drives the graph to completion on a worker pool.
pub struct Runner {
  config: RunnerConfig,
  resolver: Arc<dyn ConnectionResolver>,
}

impl Runner {
  /// Create a runner resolving connections from the local environment.
  pub fn new(config: RunnerConfig) -> Self {
    Self::with_resolver(config, Arc::new(EnvConnectionResolver::new()))
  }

  /// Create a runner with an explicit connection resolver.
  pub fn with_resolver(config: RunnerConfig, resolver: Arc<dyn ConnectionResolver>) -> Self {
    Self { config, resolver }
  }

  /// Execute one pipeline run.
  ///
  /// Validates `config` against the pipeline's parameters, invokes the
  /// body to record the task graph, then dispatches ready tasks until the
  /// graph is resolved. The first failure wins and pending tasks are
  /// abandoned; the pool is drained on every exit path. The run is atomic
  /// from the caller's perspective: a report is returned only when every
  /// declared task completed.
  #[instrument(name = "pipeline_execute", skip_all, fields(pipeline = %pipeline.code()))]
  pub async fn execute(
    &self,
    pipeline: &Pipeline,
    config: RunConfig,
  ) -> Result<RunReport, RunError> {
    let run_id = Uuid::new_v4().to_string();

    info!(run_id = %run_id, pipeline = %pipeline.code(), "pipeline_started");

    let result = self.execute_inner(pipeline, config, &run_id).await;

    match &result {
      Ok(report) => {
        info!(run_id = %run_id, tasks = report.tasks.len(), "pipeline_completed");
      }
      Err(e) => {
        error!(run_id = %run_id, error = %e, "pipeline_failed");
      }
    }

    result
  }

  async fn execute_inner(
    &self,
    pipeline: &Pipeline,
    config: RunConfig,
    run_id: &str,
  ) -> Result<RunReport, RunError> {
    let validated = validate_config(pipeline.parameters(), config, self.resolver.as_ref())?;

    let mut graph = TaskGraph::new();
    let body = pipeline.body();
    body(&mut graph, &validated).map_err(|source| RunError::Body { source })?;

    info!(run_id = %run_id, tasks = graph.len(), "task graph recorded");

    let mut pool = TokioWorkerPool::new(self.config.max_workers);
    let driven = self.drive(&mut pool, &mut graph, run_id).await;

    // Workers are joined even when the run failed; orphaned tasks are
    // never executed.
    pool.shutdown().await;

    driven?;
    Ok(RunReport::from_graph(run_id, &graph))
  }

  /// The scheduling loop: dispatch every ready task while worker slots
  /// last, then collect whatever finished, in any order.
  async fn drive(
    &self,
    pool: &mut TokioWorkerPool,
    graph: &mut TaskGraph,
    run_id: &str,
  ) -> Result<(), RunError> {
    let mut outstanding: Vec<(JobHandle, TaskRef)> = Vec::new();
    let mut dispatched = 0usize;

    loop {
      let ready = graph.ready();
      if ready.is_empty() && outstanding.is_empty() {
        break;
      }

      for task_ref in ready {
        if pool.in_flight() >= pool.capacity() {
          // Capacity exhausted: the task stays ready for a later pass.
          break;
        }

        let args = graph.resolve_args(task_ref)?;
        let Some(task) = graph.get(task_ref) else {
          return Err(
            GraphError::UnknownTaskRef {
              index: task_ref.index(),
            }
            .into(),
          );
        };
        let name = task.name().to_string();
        let func = task.func();

        let job: Job = Box::new(move || func(args));
        let handle = pool.submit(job)?;
        graph.mark_pooled(task_ref, dispatched);
        info!(
          run_id = %run_id,
          task = %name,
          dispatch_index = dispatched,
          "task_started"
        );
        dispatched += 1;
        outstanding.push((handle, task_ref));
      }

      let mut completed_any = false;
      let mut still_outstanding = Vec::with_capacity(outstanding.len());
      for (handle, task_ref) in outstanding.drain(..) {
        if !pool.poll(handle) {
          still_outstanding.push((handle, task_ref));
          continue;
        }

        let completed = pool.collect(handle).await?;
        let name = graph
          .get(task_ref)
          .map(|task| task.name().to_string())
          .unwrap_or_default();

        match completed.result {
          Ok(value) => {
            info!(run_id = %run_id, task = %name, "task_completed");
            graph.complete(task_ref, value, completed.started_at, completed.finished_at);
            completed_any = true;
          }
          Err(source) => {
            error!(run_id = %run_id, task = %name, error = %source, "task_failed");
            return Err(RunError::TaskFailed { task: name, source });
          }
        }
      }
      outstanding = still_outstanding;

      if !completed_any && !outstanding.is_empty() {
        tokio::time::sleep(self.config.poll_interval).await;
      }
    }

    Ok(())
  }
}
