// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::dag::TaskId;

#[derive(Error, Debug)]
pub enum FleetError {
    /// A caller handed a component a value that violates its contract.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A dependency or report referenced a task that does not exist.
    #[error("No such task: {0}")]
    NoSuchTask(String),

    /// Cycle found while validating a graph; `path` starts and ends on the
    /// same task.
    #[error("Loop detected in task graph: {}", render_path(.path))]
    LoopDetected { path: Vec<TaskId> },

    /// An extension point was used without an implementation behind it.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn render_path(path: &[TaskId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FleetError>;
