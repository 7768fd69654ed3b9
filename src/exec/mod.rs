// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the commands carried in task payloads with `tokio::process::Command`
//! and reports back to the runtime through `RuntimeEvent`s.
//!
//! - [`backend`] provides the `ExecutorBackend` trait, the production
//!   `ShellExecutorBackend` and [`backend_for`], which picks a backend for
//!   the plan's executor kind.
//! - [`command`] owns the executor loop receiving dispatched tasks.
//! - [`task_runner`] runs one task process to completion.

pub mod backend;
pub mod command;
pub mod task_runner;

pub use backend::{ExecutorBackend, ShellExecutorBackend, backend_for};
pub use command::spawn_executor;
