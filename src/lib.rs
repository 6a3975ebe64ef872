//! # sluice
//!
//! An SDK for declaring data pipelines as ordinary Rust code and
//! executing their task graphs with inferred dependencies.
//!
//! A pipeline pairs a parameter contract with a body. The body receives a
//! fresh [`TaskGraph`] and the validated run configuration, and declares
//! tasks whose arguments may reference other tasks; those references are
//! the dependency edges. The [`Runner`] validates the configuration
//! first (failing fast before anything executes), invokes the body to
//! record the graph, then dispatches ready tasks to a fixed-size worker
//! pool until the graph is resolved.
//!
//! ```rust,ignore
//! use serde_json::json;
//! use sluice::prelude::*;
//!
//! let pipeline = Pipeline::builder("double-up", "Double up")
//!   .parameter(
//!     Parameter::builder("count", ParameterType::Integer)
//!       .default(json!(5))
//!       .build()?,
//!   )
//!   .body(|graph, config| {
//!     let count = config["count"].clone();
//!     let up = graph.declare(
//!       "up",
//!       |args| Ok(json!(args.positional[0].as_i64().unwrap_or(0) * 2)),
//!       vec![count.into()],
//!       vec![],
//!     )?;
//!     graph.declare(
//!       "down",
//!       |args| Ok(args.positional[0].clone()),
//!       vec![up.into()],
//!       vec![],
//!     )?;
//!     Ok(())
//!   })
//!   .build()?;
//!
//! let runner = Runner::new(RunnerConfig::default());
//! let report = runner.execute(&pipeline, RunConfig::new()).await?;
//! assert_eq!(report.task("up").unwrap().result, json!(10));
//! ```

pub use sluice_engine::{
  CompletedJob, DEFAULT_MAX_WORKERS, DEFAULT_POLL_INTERVAL, Job, JobHandle, PoolError, RunError,
  RunReport, Runner, RunnerConfig, TaskRecord, TokioWorkerPool, WorkerPool,
};
pub use sluice_params::{
  Connection, ConnectionDoesNotExist, ConnectionKind, ConnectionResolver, EnvConnectionResolver,
  Parameter, ParameterBuilder, ParameterDeclarationError, ParameterSpec, ParameterType,
  ParameterValueError, RunConfig, StaticConnectionResolver, validate_config,
};
pub use sluice_pipeline::{
  Argument, BodyError, GraphError, Pipeline, PipelineBody, PipelineBuilder,
  PipelineDefinitionError, Task, TaskArgs, TaskError, TaskFn, TaskGraph, TaskRef,
};

/// Convenient imports for pipeline authors.
pub mod prelude {
  pub use sluice_engine::{RunError, RunReport, Runner, RunnerConfig};
  pub use sluice_params::{
    Connection, ConnectionKind, Parameter, ParameterType, RunConfig, StaticConnectionResolver,
  };
  pub use sluice_pipeline::{Argument, Pipeline, TaskArgs, TaskError, TaskGraph, TaskRef};
}
