// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `CommandBackend` trait and the production
//!   `ProcessBackend`, which tests can replace with a fake implementation.
//! - [`task_runner`] runs one attempt of a task as an OS process using
//!   `tokio::process::Command`.
//! - [`output`] merges stdout/stderr into one buffer and truncates it.
//! - [`retry`] drives repeated attempts and produces the final `TaskResult`.

pub mod backend;
pub mod output;
pub mod retry;
pub mod task_runner;

pub use backend::{Attempt, AttemptError, CommandBackend, ProcessBackend};
pub use output::{truncate_output, OutputSink, ELISION_MARKER};
pub use retry::execute_with_retry;
pub use task_runner::run_command;
