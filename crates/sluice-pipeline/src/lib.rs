//! Pipeline and task-graph model for sluice.
//!
//! A [`Pipeline`] pairs a parameter contract with a body closure. Invoking
//! the body against a fresh [`TaskGraph`] records [`Task`] nodes; arguments
//! that reference other tasks are the dependency edges the engine
//! schedules around. No task executes while the body runs — declaring only
//! captures the call.

mod graph;
mod pipeline;
mod task;

pub use graph::{GraphError, TaskGraph};
pub use pipeline::{BodyError, Pipeline, PipelineBody, PipelineBuilder, PipelineDefinitionError};
pub use task::{Argument, Task, TaskArgs, TaskError, TaskFn, TaskRef};
