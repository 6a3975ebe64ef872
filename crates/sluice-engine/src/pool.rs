//! Worker pool abstraction.
//!
//! The engine drives a fixed-size pool through a narrow contract: submit a
//! job, poll its handle without blocking, collect the completed outcome by
//! value, shut the pool down. The Tokio implementation runs each job on
//! its own blocking thread, so task bodies never share state with the
//! coordinator beyond the handle they are collected through.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;

use sluice_pipeline::TaskError;

/// A unit of work submitted to the pool.
pub type Job = Box<dyn FnOnce() -> Result<Value, TaskError> + Send + 'static>;

/// Handle to a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(u64);

/// A finished job, marshalled back by value from the worker.
#[derive(Debug)]
pub struct CompletedJob {
  pub result: Result<Value, TaskError>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

/// Errors surfaced by the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
  /// Every worker slot is occupied.
  #[error("worker pool is saturated ({capacity} slots)")]
  Saturated { capacity: usize },

  /// The handle does not belong to an in-flight job.
  #[error("unknown job handle {0}")]
  UnknownHandle(u64),

  /// The worker running the job panicked.
  #[error("worker panicked: {message}")]
  WorkerPanicked { message: String },
}

/// Process/thread pool contract the engine schedules against.
///
/// Implementations must support many concurrently in-flight jobs with
/// independent, non-blocking submission and polling.
#[async_trait]
pub trait WorkerPool: Send {
  /// Submit a job for execution. Fails when the pool is saturated.
  fn submit(&mut self, job: Job) -> Result<JobHandle, PoolError>;

  /// Non-blocking completion check.
  fn poll(&self, handle: JobHandle) -> bool;

  /// Collect a completed job's outcome. Call only after [`WorkerPool::poll`]
  /// reported completion.
  async fn collect(&mut self, handle: JobHandle) -> Result<CompletedJob, PoolError>;

  /// Number of worker slots.
  fn capacity(&self) -> usize;

  /// Number of jobs currently in flight.
  fn in_flight(&self) -> usize;

  /// Join every job still in flight and release the workers.
  async fn shutdown(&mut self);
}

/// Fixed-size pool over Tokio's blocking thread pool.
pub struct TokioWorkerPool {
  capacity: usize,
  next_id: u64,
  inflight: HashMap<u64, JoinHandle<CompletedJob>>,
}

impl TokioWorkerPool {
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity: capacity.max(1),
      next_id: 0,
      inflight: HashMap::new(),
    }
  }
}

#[async_trait]
impl WorkerPool for TokioWorkerPool {
  fn submit(&mut self, job: Job) -> Result<JobHandle, PoolError> {
    if self.inflight.len() >= self.capacity {
      return Err(PoolError::Saturated {
        capacity: self.capacity,
      });
    }

    // Timestamps are taken inside the worker and travel back by value.
    let handle = tokio::task::spawn_blocking(move || {
      let started_at = Utc::now();
      let result = job();
      CompletedJob {
        result,
        started_at,
        finished_at: Utc::now(),
      }
    });

    let id = self.next_id;
    self.next_id += 1;
    self.inflight.insert(id, handle);
    Ok(JobHandle(id))
  }

  fn poll(&self, handle: JobHandle) -> bool {
    self
      .inflight
      .get(&handle.0)
      .is_some_and(|join| join.is_finished())
  }

  async fn collect(&mut self, handle: JobHandle) -> Result<CompletedJob, PoolError> {
    let Some(join) = self.inflight.remove(&handle.0) else {
      return Err(PoolError::UnknownHandle(handle.0));
    };

    join.await.map_err(|e| PoolError::WorkerPanicked {
      message: e.to_string(),
    })
  }

  fn capacity(&self) -> usize {
    self.capacity
  }

  fn in_flight(&self) -> usize {
    self.inflight.len()
  }

  async fn shutdown(&mut self) {
    // Orphaned outcomes are discarded; joining keeps workers from
    // outliving the run.
    let handles: Vec<JoinHandle<CompletedJob>> =
      self.inflight.drain().map(|(_, join)| join).collect();
    let _ = futures::future::join_all(handles).await;
  }
}
