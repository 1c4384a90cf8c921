// src/dag/mod.rs

//! Task model and dependency handling.
//!
//! - [`task`] defines `TaskSpec` (registration input), `Task` (resolved,
//!   immutable) and `TaskResult`.
//! - [`graph`] holds a simple adjacency view of the task set.
//! - [`validate`] rejects unknown dependencies and cycles before anything runs.
//! - [`resolver`] tracks completions and decides which dependents are ready.

pub mod graph;
pub mod resolver;
pub mod task;
pub mod validate;

pub use graph::DagGraph;
pub use resolver::DependencyResolver;
pub use task::{Task, TaskId, TaskResult, TaskSpec};
pub use validate::validate_tasks;
