//! Pipeline execution engine for sluice.
//!
//! The [`Runner`] validates a run configuration, invokes the pipeline body
//! to record the task graph, then drives the graph on a fixed-size
//! [`WorkerPool`]:
//! - ready tasks (all dependencies completed) dispatch in declaration
//!   order, bounded by pool capacity
//! - handles are polled without blocking; completion order is immaterial
//! - the first failure stops dispatching and fails the run
//! - the pool is drained and joined on every exit path

mod error;
mod executor;
mod pool;
mod report;

pub use error::RunError;
pub use executor::{DEFAULT_MAX_WORKERS, DEFAULT_POLL_INTERVAL, Runner, RunnerConfig};
pub use pool::{CompletedJob, Job, JobHandle, PoolError, TokioWorkerPool, WorkerPool};
pub use report::{RunReport, TaskRecord};
