// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    MissingDependency { task: String, dependency: String },

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl SchedulerError {
    /// Whether this error stems from an invalid task set or config file,
    /// i.e. nothing was (or will be) executed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SchedulerError::ConfigError(_)
                | SchedulerError::MissingDependency { .. }
                | SchedulerError::DagCycle(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
