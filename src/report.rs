// src/report.rs

//! Status reporting and the explicit context handed to a [`Cluster`].
//!
//! [`Cluster`]: crate::dag::Cluster

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dag::{ClusterSnapshot, TaskId};
use crate::types::TaskStatus;

/// Receives status snapshots from the scheduler.
///
/// Implementations decide how (and whether) to ship them anywhere.
pub trait StatusReporter: Send + Sync {
    /// Called once at the end of every scheduling round.
    fn round_finished(&self, snapshot: &ClusterSnapshot);

    /// Called whenever a task changes status through a report or skip.
    fn task_changed(&self, _id: &TaskId, _status: TaskStatus) {}
}

/// Default reporter: writes snapshots to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn round_finished(&self, snapshot: &ClusterSnapshot) {
        info!(
            cluster = %snapshot.name,
            round = snapshot.round,
            status = %snapshot.status,
            "round finished"
        );
        for node in &snapshot.nodes {
            debug!(node = %node.name, status = %node.status, "node status");
        }
    }

    fn task_changed(&self, id: &TaskId, status: TaskStatus) {
        debug!(task = %id, %status, "task status changed");
    }
}

/// Scheduling policy knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Abort the whole cluster on the first task failure.
    pub fail_fast: bool,
}

/// Everything a cluster needs from its surroundings.
#[derive(Clone)]
pub struct Context {
    pub reporter: Arc<dyn StatusReporter>,
    pub options: ClusterOptions,
}

impl Context {
    pub fn new(reporter: Arc<dyn StatusReporter>, options: ClusterOptions) -> Self {
        Self { reporter, options }
    }

    pub fn with_options(options: ClusterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self {
            reporter: Arc::new(TracingReporter),
            options: ClusterOptions::default(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
