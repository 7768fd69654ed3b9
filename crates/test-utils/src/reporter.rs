use std::sync::{Arc, Mutex};

use fleetdag::dag::{ClusterSnapshot, TaskId};
use fleetdag::report::StatusReporter;
use fleetdag::types::TaskStatus;

/// Reporter that keeps every snapshot and status change for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    rounds: Mutex<Vec<ClusterSnapshot>>,
    changes: Mutex<Vec<(TaskId, TaskStatus)>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rounds(&self) -> Vec<ClusterSnapshot> {
        self.rounds.lock().unwrap().clone()
    }

    pub fn last_round(&self) -> Option<ClusterSnapshot> {
        self.rounds.lock().unwrap().last().cloned()
    }

    pub fn changes(&self) -> Vec<(TaskId, TaskStatus)> {
        self.changes.lock().unwrap().clone()
    }
}

impl StatusReporter for RecordingReporter {
    fn round_finished(&self, snapshot: &ClusterSnapshot) {
        self.rounds.lock().unwrap().push(snapshot.clone());
    }

    fn task_changed(&self, id: &TaskId, status: TaskStatus) {
        self.changes.lock().unwrap().push((id.clone(), status));
    }
}
