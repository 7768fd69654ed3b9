// src/engine/core.rs

//! Synchronous core of the runtime.
//!
//! Consumes [`RuntimeEvent`]s, applies them to the [`Cluster`], runs one
//! scheduling round and says what the IO shell should do next. No channels,
//! no Tokio, no processes: everything here can be stepped by hand in tests.

use tracing::{error, info, warn};

use crate::dag::{Cluster, Dispatch};
use crate::engine::{RunSummary, RuntimeEvent};
use crate::errors::Result;

/// Command for the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these tasks to the executor.
    DispatchTasks(Vec<Dispatch>),
    /// The run is over.
    RequestExit,
}

/// Decision returned after handling one event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should wait for more events.
    pub keep_running: bool,
}

#[derive(Debug)]
pub struct CoreRuntime {
    cluster: Cluster,
    shutdown_requested: bool,
    deadlocked: bool,
}

impl CoreRuntime {
    pub fn new(cluster: Cluster) -> Self {
        Self {
            cluster,
            shutdown_requested: false,
            deadlocked: false,
        }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn into_cluster(self) -> Cluster {
        self.cluster
    }

    /// Validate the cluster and run the first round.
    pub fn start(&mut self) -> Result<CoreStep> {
        self.cluster.validate()?;
        self.poll()
    }

    /// Apply one event, then run a scheduling round.
    pub fn step(&mut self, event: RuntimeEvent) -> Result<CoreStep> {
        self.step_all([event])
    }

    /// Apply a batch of queued events, then run a single scheduling round.
    pub fn step_all(&mut self, events: impl IntoIterator<Item = RuntimeEvent>) -> Result<CoreStep> {
        for event in events {
            if !self.apply(event)? {
                return Ok(CoreStep {
                    commands: vec![CoreCommand::RequestExit],
                    keep_running: false,
                });
            }
        }
        self.poll()
    }

    /// Returns `false` when the run must stop right away.
    fn apply(&mut self, event: RuntimeEvent) -> Result<bool> {
        match event {
            RuntimeEvent::TaskCompleted { task, outcome } => {
                self.cluster.report(&task.node, &task.task, outcome)?;
            }
            RuntimeEvent::TaskSkipped { task } => {
                self.cluster.skip(&task.node, &task.task)?;
            }
            RuntimeEvent::NodeAborted { node } => {
                self.cluster.abort_node(&node)?;
            }
            RuntimeEvent::ShutdownRequested => {
                if self.shutdown_requested {
                    warn!("second shutdown request; stopping without waiting for running tasks");
                    return Ok(false);
                }
                info!(
                    running = self.cluster.running_count(),
                    "shutdown requested; waiting for running tasks"
                );
                self.shutdown_requested = true;
                self.cluster.abort();
            }
        }
        Ok(true)
    }

    fn poll(&mut self) -> Result<CoreStep> {
        let round = self.cluster.step()?;
        let mut commands = Vec::new();

        if !round.dispatched.is_empty() {
            commands.push(CoreCommand::DispatchTasks(round.dispatched));
        }

        let mut keep_running = true;
        if self.cluster.is_finished() {
            info!(status = %round.status, rounds = round.number, "all nodes finished");
            keep_running = false;
        } else if round.deadlock {
            error!(
                round = round.number,
                "deadlock: pending tasks remain but nothing can run"
            );
            self.deadlocked = true;
            keep_running = false;
        }

        if !keep_running {
            commands.push(CoreCommand::RequestExit);
        }

        Ok(CoreStep {
            commands,
            keep_running,
        })
    }

    pub fn summary(&self) -> RunSummary {
        let snapshot = self.cluster.snapshot();
        RunSummary {
            status: snapshot.status,
            rounds: snapshot.round,
            deadlocked: self.deadlocked,
            nodes: snapshot.nodes,
        }
    }
}
