// src/engine/mod.rs

//! Drives a [`Cluster`] to completion.
//!
//! The synchronous decision logic lives in [`core`]: it turns
//! [`RuntimeEvent`]s into cluster updates and returns commands. The async
//! shell in [`runtime`] reads events from a channel, feeds them to the core
//! and hands dispatched tasks to an executor. Because every report funnels
//! through that one channel, counter admission and release never race.
//!
//! [`Cluster`]: crate::dag::Cluster

use crate::dag::{NodeName, NodeSnapshot, TaskId};
use crate::types::{RunStatus, TaskOutcome};

/// Events flowing into the runtime from executors and the outside world.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// An executor finished running a task.
    TaskCompleted { task: TaskId, outcome: TaskOutcome },
    /// Operator override: bypass a task that has not started.
    TaskSkipped { task: TaskId },
    /// Stop dispatching on one node.
    NodeAborted { node: NodeName },
    /// Graceful shutdown (e.g. Ctrl-C). A second request stops immediately.
    ShutdownRequested,
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: RunStatus,
    pub rounds: u64,
    /// The run stopped because nothing could make progress.
    pub deadlocked: bool,
    pub nodes: Vec<NodeSnapshot>,
}

impl RunSummary {
    pub fn is_successful(&self) -> bool {
        self.status == RunStatus::Successful
    }
}

pub mod core;
pub mod runtime;

pub use self::core::{CoreCommand, CoreRuntime, CoreStep};
pub use self::runtime::Runtime;
