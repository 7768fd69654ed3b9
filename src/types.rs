// src/types.rs

//! Small shared enums: task and run statuses, executor outcomes and the
//! executor transport kinds a plan may select.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Status of a single task.
///
/// `Successful`, `Failed`, `DepFailed` and `Skipped` are terminal: once a
/// task reaches one of them no further transition is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    Running,
    Successful,
    Failed,
    /// A direct or transitive predecessor failed.
    DepFailed,
    /// Bypassed by an explicit override; satisfies dependents.
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Successful | TaskStatus::Failed | TaskStatus::DepFailed | TaskStatus::Skipped
        )
    }

    /// Whether a dependent may treat this predecessor as done.
    pub fn satisfies_dependents(self) -> bool {
        matches!(self, TaskStatus::Successful | TaskStatus::Skipped)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::DepFailed)
    }

    /// Transition table for the task state machine.
    pub fn allows(self, next: TaskStatus) -> bool {
        use TaskStatus::*;

        if self.is_terminal() || self == next {
            return false;
        }

        match next {
            Pending => false,
            Ready => self == Pending,
            Running => self == Ready,
            Skipped => matches!(self, Pending | Ready),
            // Executor outcomes only apply to dispatched tasks.
            Successful | Failed => self == Running,
            DepFailed => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Ready => "ready",
            TaskStatus::Running => "running",
            TaskStatus::Successful => "successful",
            TaskStatus::Failed => "failed",
            TaskStatus::DepFailed => "dep_failed",
            TaskStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "ready" => Ok(TaskStatus::Ready),
            "running" => Ok(TaskStatus::Running),
            "successful" | "success" => Ok(TaskStatus::Successful),
            "failed" => Ok(TaskStatus::Failed),
            "dep_failed" => Ok(TaskStatus::DepFailed),
            "skipped" => Ok(TaskStatus::Skipped),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

/// Aggregated status of a node or a whole cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Pending,
    Running,
    Successful,
    Failed,
}

impl RunStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, RunStatus::Successful | RunStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Successful => "successful",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported by an executor for a dispatched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(i32),
}

impl TaskOutcome {
    pub fn status(self) -> TaskStatus {
        match self {
            TaskOutcome::Success => TaskStatus::Successful,
            TaskOutcome::Failed(_) => TaskStatus::Failed,
        }
    }
}

/// Transport used to run task payloads on their target machines.
///
/// Only `Shell` is supplied by this crate; the others are extension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Shell,
    Ssh,
    Rpc,
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::Shell
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutorKind::Shell => "shell",
            ExecutorKind::Ssh => "ssh",
            ExecutorKind::Rpc => "rpc",
        };
        f.write_str(s)
    }
}
