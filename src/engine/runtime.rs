// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::Dispatch;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RunSummary, RuntimeEvent};

/// Async shell around [`CoreRuntime`]: reads events, feeds them to the core
/// and hands dispatched tasks to an [`ExecutorBackend`].
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// Returns once every node has finished, the run deadlocks, shutdown is
    /// requested twice, or the event channel closes.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!(cluster = %self.core.cluster().name(), "fleetdag runtime started");

        let step = self.core.start()?;
        let mut keep_running = self.execute(step).await?;

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            let mut events = vec![event];
            while let Ok(more) = self.event_rx.try_recv() {
                events.push(more);
            }

            debug!(count = events.len(), "runtime applying queued events");
            let step = self.core.step_all(events)?;
            keep_running = self.execute(step).await?;
        }

        let summary = self.core.summary();
        info!(
            status = %summary.status,
            rounds = summary.rounds,
            deadlocked = summary.deadlocked,
            "runtime exiting"
        );
        Ok(summary)
    }

    async fn execute(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            match command {
                CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
                CoreCommand::RequestExit => debug!("core issued RequestExit command"),
            }
        }
        Ok(step.keep_running)
    }

    async fn spawn_ready(&mut self, tasks: Vec<Dispatch>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<String> = tasks.iter().map(|t| t.task.to_string()).collect();
        debug!(?names, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
