// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender,
//! so tests can swap in a fake that records dispatches and answers with
//! `TaskCompleted` events directly.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::dag::Dispatch;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, FleetError, Result};
use crate::types::ExecutorKind;

use super::command::spawn_executor;

/// Trait abstracting how dispatched tasks are executed.
pub trait ExecutorBackend: Send {
    /// Hand the given tasks over for execution.
    ///
    /// Completion is reported asynchronously through the runtime channel,
    /// never through the returned future.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Dispatch>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs each task's `cmd` through the local shell.
///
/// Wraps the background loop from [`spawn_executor`]; `spawn_ready_tasks`
/// only forwards tasks over a channel.
#[derive(Debug)]
pub struct ShellExecutorBackend {
    tx: mpsc::Sender<Dispatch>,
}

impl ShellExecutorBackend {
    /// Spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for ShellExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Dispatch>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}

/// Build the backend configured for a plan.
///
/// Only local shell execution exists; remote kinds are rejected up front so
/// a run never starts half-wired.
pub fn backend_for(
    kind: ExecutorKind,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<ShellExecutorBackend> {
    match kind {
        ExecutorKind::Shell => Ok(ShellExecutorBackend::new(runtime_tx)),
        other => Err(FleetError::NotImplemented(format!("executor '{other}'"))),
    }
}
