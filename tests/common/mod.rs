#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Write;

use tempfile::NamedTempFile;

use fleetdag::dag::{Cluster, TaskId};
use fleetdag::types::TaskOutcome;

pub use fleetdag_test_utils::builders::{payload, ClusterBuilder, NodeBuilder, TaskBuilder};
pub use fleetdag_test_utils::{init_tracing, with_timeout};

/// Write `contents` to a temporary `.toml` file.
pub fn write_plan(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    write!(file, "{contents}").unwrap();
    file
}

pub fn id(node: &str, task: &str) -> TaskId {
    TaskId::new(node, task)
}

/// Drive `cluster` synchronously: every dispatched task completes before
/// the next round, failing if it is in `failing`.
///
/// Returns the tasks in dispatch order. Stops when the cluster is finished,
/// on deadlock, or after `max_rounds`.
pub fn drive(cluster: &mut Cluster, failing: &HashSet<TaskId>, max_rounds: u64) -> Vec<TaskId> {
    let mut order = Vec::new();

    for _ in 0..max_rounds {
        let round = cluster.step().unwrap();
        if round.deadlock || (round.dispatched.is_empty() && cluster.is_finished()) {
            break;
        }
        for dispatch in round.dispatched {
            let outcome = if failing.contains(&dispatch.task) {
                TaskOutcome::Failed(1)
            } else {
                TaskOutcome::Success
            };
            cluster
                .report(&dispatch.task.node, &dispatch.task.task, outcome)
                .unwrap();
            order.push(dispatch.task);
        }
        if cluster.is_finished() {
            break;
        }
    }

    order
}
