// tests/cluster.rs

mod common;
use crate::common::{drive, id, init_tracing, ClusterBuilder, NodeBuilder, TaskBuilder};

use std::collections::HashSet;

use fleetdag::dag::{Cluster, Node, RUNNING_NODES};
use fleetdag::errors::FleetError;
use fleetdag::types::{RunStatus, TaskOutcome, TaskStatus};
use fleetdag_test_utils::RecordingReporter;

fn status(cluster: &Cluster, node: &str, task: &str) -> TaskStatus {
    cluster.node(node).unwrap().task(task).unwrap().status()
}

fn dispatched_names(round: &fleetdag::dag::Round) -> Vec<String> {
    round.dispatched.iter().map(|d| d.task.to_string()).collect()
}

#[test]
fn first_round_dispatches_roots() {
    init_tracing();
    let mut cluster = ClusterBuilder::new("c")
        .node(
            NodeBuilder::new("web")
                .concurrency(0)
                .task(TaskBuilder::new("A"))
                .task(TaskBuilder::new("B").after("A"))
                .task(TaskBuilder::new("C").after("A")),
        )
        .build();

    assert_eq!(cluster.status(), RunStatus::Pending);
    let round = cluster.step().unwrap();
    assert!(cluster.is_validated());
    assert_eq!(round.number, 1);
    assert_eq!(round.newly_ready, vec![id("web", "A")]);
    assert_eq!(dispatched_names(&round), vec!["web/A"]);
    assert_eq!(round.dispatched[0].payload["cmd"].as_str(), Some("echo A"));
    assert_eq!(round.status, RunStatus::Running);

    cluster.report("web", "A", TaskOutcome::Success).unwrap();
    let round = cluster.step().unwrap();
    assert_eq!(round.newly_ready, vec![id("web", "B"), id("web", "C")]);
    assert_eq!(dispatched_names(&round), vec!["web/B", "web/C"]);
}

#[test]
fn counter_with_maximum_one_serializes_tasks() {
    let mut cluster = ClusterBuilder::new("c")
        .counter("db", 1)
        .node(NodeBuilder::new("n1").task(TaskBuilder::new("X").counter("db")))
        .node(NodeBuilder::new("n2").task(TaskBuilder::new("Y").counter("db")))
        .build();

    let round = cluster.step().unwrap();
    assert_eq!(dispatched_names(&round), vec!["n1/X"]);
    let db = cluster.counters().peek("db").unwrap().unwrap();
    assert_eq!(db.current(), 1);
    assert!(!db.is_active());
    assert_eq!(status(&cluster, "n2", "Y"), TaskStatus::Ready);

    // Still refused while X runs.
    let round = cluster.step().unwrap();
    assert!(round.dispatched.is_empty());
    assert!(!round.deadlock);

    cluster.report("n1", "X", TaskOutcome::Success).unwrap();
    assert_eq!(cluster.counters().peek("db").unwrap().unwrap().current(), 0);

    let round = cluster.step().unwrap();
    assert_eq!(dispatched_names(&round), vec!["n2/Y"]);
}

#[test]
fn undeclared_counters_never_block() {
    let mut cluster = ClusterBuilder::new("c")
        .node(
            NodeBuilder::new("n")
                .concurrency(0)
                .task(TaskBuilder::new("a").counter(":reboot"))
                .task(TaskBuilder::new("b").counter(":reboot"))
                .task(TaskBuilder::new("c").counter(":reboot")),
        )
        .build();

    let round = cluster.step().unwrap();
    assert_eq!(round.dispatched.len(), 3);
    let reboot = cluster.counters().peek(":reboot").unwrap().unwrap();
    assert_eq!(reboot.current(), 3);
    assert!(reboot.is_active());
}

#[test]
fn running_nodes_limit_gates_whole_nodes() {
    let mut cluster = ClusterBuilder::new("c")
        .limit_running_nodes(1)
        .node(
            NodeBuilder::new("n1")
                .concurrency(0)
                .task(TaskBuilder::new("a"))
                .task(TaskBuilder::new("b")),
        )
        .node(NodeBuilder::new("n2").task(TaskBuilder::new("a")))
        .build();

    // A busy node may keep starting tasks; another node may not start.
    let round = cluster.step().unwrap();
    assert_eq!(dispatched_names(&round), vec!["n1/a", "n1/b"]);
    assert_eq!(cluster.counters().peek(RUNNING_NODES).unwrap().unwrap().current(), 1);

    cluster.report("n1", "a", TaskOutcome::Success).unwrap();
    assert!(cluster.step().unwrap().dispatched.is_empty());

    cluster.report("n1", "b", TaskOutcome::Success).unwrap();
    assert_eq!(cluster.counters().peek(RUNNING_NODES).unwrap().unwrap().current(), 0);
    let round = cluster.step().unwrap();
    assert_eq!(dispatched_names(&round), vec!["n2/a"]);
}

#[test]
fn cross_node_dependency_waits_for_predecessor() {
    let mut cluster = ClusterBuilder::new("c")
        .node(NodeBuilder::new("db").task(TaskBuilder::new("migrate")))
        .node(NodeBuilder::new("web").task(TaskBuilder::new("deploy").after("db/migrate")))
        .build();

    let order = drive(&mut cluster, &HashSet::new(), 10);
    assert_eq!(order, vec![id("db", "migrate"), id("web", "deploy")]);
    assert_eq!(cluster.status(), RunStatus::Successful);
}

#[test]
fn failure_cascades_across_nodes() {
    let mut cluster = ClusterBuilder::new("c")
        .node(
            NodeBuilder::new("db")
                .task(TaskBuilder::new("migrate"))
                .task(TaskBuilder::new("backup")),
        )
        .node(
            NodeBuilder::new("web")
                .task(TaskBuilder::new("deploy").after("db/migrate"))
                .task(TaskBuilder::new("warm").after("deploy")),
        )
        .build();

    let failing = HashSet::from([id("db", "migrate")]);
    let order = drive(&mut cluster, &failing, 10);

    assert_eq!(order, vec![id("db", "migrate"), id("db", "backup")]);
    assert_eq!(status(&cluster, "web", "deploy"), TaskStatus::DepFailed);
    assert_eq!(status(&cluster, "web", "warm"), TaskStatus::DepFailed);
    assert_eq!(cluster.node("web").unwrap().status(), RunStatus::Failed);
    assert_eq!(cluster.status(), RunStatus::Failed);
}

#[test]
fn other_nodes_continue_without_fail_fast() {
    let mut cluster = ClusterBuilder::new("c")
        .node(NodeBuilder::new("n1").task(TaskBuilder::new("bad")))
        .node(
            NodeBuilder::new("n2")
                .task(TaskBuilder::new("one"))
                .task(TaskBuilder::new("two").after("one")),
        )
        .build();

    cluster.step().unwrap();
    cluster.report("n1", "bad", TaskOutcome::Failed(1)).unwrap();
    assert_eq!(cluster.status(), RunStatus::Running);

    cluster.report("n2", "one", TaskOutcome::Success).unwrap();
    drive(&mut cluster, &HashSet::new(), 10);
    assert_eq!(status(&cluster, "n2", "two"), TaskStatus::Successful);
    assert_eq!(cluster.status(), RunStatus::Failed);
}

#[test]
fn fail_fast_aborts_every_node() {
    let mut cluster = ClusterBuilder::new("c")
        .fail_fast(true)
        .node(NodeBuilder::new("n1").task(TaskBuilder::new("bad")))
        .node(
            NodeBuilder::new("n2")
                .task(TaskBuilder::new("one"))
                .task(TaskBuilder::new("two").after("one")),
        )
        .build();

    let round = cluster.step().unwrap();
    assert_eq!(dispatched_names(&round), vec!["n1/bad", "n2/one"]);

    cluster.report("n1", "bad", TaskOutcome::Failed(1)).unwrap();
    assert!(cluster.is_aborted());
    assert_eq!(cluster.status(), RunStatus::Failed);

    // The running task still reports; nothing new starts.
    cluster.report("n2", "one", TaskOutcome::Success).unwrap();
    let round = cluster.step().unwrap();
    assert!(round.dispatched.is_empty());
    assert_eq!(status(&cluster, "n2", "two"), TaskStatus::Ready);
    assert!(cluster.is_finished());
}

#[test]
fn skip_counts_as_done_for_dependents() {
    let mut cluster = ClusterBuilder::new("c")
        .node(
            NodeBuilder::new("n")
                .task(TaskBuilder::new("reboot"))
                .task(TaskBuilder::new("check").after("reboot")),
        )
        .build();

    assert!(cluster.skip("n", "reboot").unwrap());
    let order = drive(&mut cluster, &HashSet::new(), 10);
    assert_eq!(order, vec![id("n", "check")]);
    assert_eq!(cluster.status(), RunStatus::Successful);
}

#[test]
fn duplicate_report_changes_nothing() {
    let mut cluster = ClusterBuilder::new("c")
        .counter("db", 1)
        .node(NodeBuilder::new("n").task(TaskBuilder::new("a").counter("db")))
        .build();

    cluster.step().unwrap();
    assert!(cluster.report("n", "a", TaskOutcome::Success).unwrap());
    assert!(!cluster.report("n", "a", TaskOutcome::Failed(1)).unwrap());
    assert_eq!(cluster.counters().peek("db").unwrap().unwrap().current(), 0);
    assert_eq!(status(&cluster, "n", "a"), TaskStatus::Successful);
}

#[test]
fn reports_for_undispatched_tasks_are_ignored() {
    let mut cluster = ClusterBuilder::new("c")
        .node(
            NodeBuilder::new("n")
                .task(TaskBuilder::new("a"))
                .task(TaskBuilder::new("b").after("a")),
        )
        .build();

    let round = cluster.step().unwrap();
    assert_eq!(dispatched_names(&round), vec!["n/a"]);

    assert!(!cluster.report("n", "b", TaskOutcome::Success).unwrap());
    assert!(!cluster.report("n", "b", TaskOutcome::Failed(1)).unwrap());
    assert_eq!(status(&cluster, "n", "a"), TaskStatus::Running);
    assert_eq!(status(&cluster, "n", "b"), TaskStatus::Pending);

    cluster.report("n", "a", TaskOutcome::Success).unwrap();
    cluster.step().unwrap();
    assert_eq!(status(&cluster, "n", "b"), TaskStatus::Running);
}

#[test]
fn failure_reaches_running_tasks_behind_a_skipped_task() {
    let mut cluster = ClusterBuilder::new("c")
        .node(
            NodeBuilder::new("n")
                .concurrency(0)
                .task(TaskBuilder::new("a"))
                .task(TaskBuilder::new("b").after("a"))
                .task(TaskBuilder::new("c").after("b")),
        )
        .node(NodeBuilder::new("m").task(TaskBuilder::new("d").after("n/b")))
        .build();

    assert!(cluster.skip("n", "b").unwrap());
    let round = cluster.step().unwrap();
    assert_eq!(dispatched_names(&round), vec!["n/a", "n/c", "m/d"]);

    assert!(cluster.report("n", "a", TaskOutcome::Failed(1)).unwrap());
    assert_eq!(status(&cluster, "n", "b"), TaskStatus::Skipped);
    assert_eq!(status(&cluster, "n", "c"), TaskStatus::DepFailed);
    assert_eq!(status(&cluster, "m", "d"), TaskStatus::DepFailed);
    assert_eq!(cluster.in_flight(), 2);

    // Late outcomes for the cascaded tasks change nothing.
    assert!(!cluster.report("n", "c", TaskOutcome::Success).unwrap());
    assert!(!cluster.report("m", "d", TaskOutcome::Success).unwrap());
    assert_eq!(status(&cluster, "n", "c"), TaskStatus::DepFailed);
    assert_eq!(cluster.in_flight(), 0);
    assert_eq!(cluster.status(), RunStatus::Failed);
}

#[test]
fn reports_for_unknown_targets_fail() {
    let mut cluster = ClusterBuilder::new("c")
        .node(NodeBuilder::new("n").task(TaskBuilder::new("a")))
        .build();
    cluster.step().unwrap();

    assert!(matches!(
        cluster.report("ghost", "a", TaskOutcome::Success),
        Err(FleetError::NoSuchTask(_))
    ));
    assert!(matches!(
        cluster.report("n", "ghost", TaskOutcome::Success),
        Err(FleetError::NoSuchTask(_))
    ));
    assert!(matches!(
        cluster.abort_node("ghost"),
        Err(FleetError::InvalidArgument(_))
    ));
}

#[test]
fn duplicate_node_names_are_rejected() {
    let mut cluster = Cluster::new("c");
    cluster.add_node(Node::new("n")).unwrap();
    assert!(matches!(
        cluster.add_node(Node::new("n")),
        Err(FleetError::InvalidArgument(_))
    ));
    assert!(matches!(
        cluster.add_node(Node::new("")),
        Err(FleetError::InvalidArgument(_))
    ));
}

#[test]
fn cycle_across_nodes_is_detected() {
    let mut cluster = ClusterBuilder::new("c")
        .node(NodeBuilder::new("a").task(TaskBuilder::new("t").after("b/t")))
        .node(NodeBuilder::new("b").task(TaskBuilder::new("t").after("a/t")))
        .build();

    match cluster.validate() {
        Err(FleetError::LoopDetected { path }) => {
            assert_eq!(path, vec![id("a", "t"), id("b", "t"), id("a", "t")]);
        }
        other => panic!("expected LoopDetected, got {other:?}"),
    }
    assert!(cluster.step().is_err());
}

#[test]
fn dangling_cross_node_dependency_is_reported() {
    let mut cluster = ClusterBuilder::new("c")
        .node(NodeBuilder::new("web").task(TaskBuilder::new("deploy").after("db/migrate")))
        .build();
    assert!(matches!(cluster.validate(), Err(FleetError::NoSuchTask(_))));
}

#[test]
fn aborted_node_leaves_dependents_stuck_and_reports_deadlock() {
    let mut cluster = ClusterBuilder::new("c")
        .node(NodeBuilder::new("db").task(TaskBuilder::new("migrate")))
        .node(NodeBuilder::new("web").task(TaskBuilder::new("deploy").after("db/migrate")))
        .build();

    cluster.validate().unwrap();
    cluster.abort_node("db").unwrap();

    let round = cluster.step().unwrap();
    assert!(round.dispatched.is_empty());
    assert!(round.deadlock);
    assert_eq!(status(&cluster, "web", "deploy"), TaskStatus::Pending);
}

#[test]
fn node_mut_forces_revalidation() {
    let mut cluster = ClusterBuilder::new("c")
        .node(NodeBuilder::new("n").task(TaskBuilder::new("a")))
        .build_validated();

    let node = cluster.node_mut("n").unwrap();
    node.add_task("b", fleetdag_test_utils::payload("true")).unwrap();
    node.add_dependency("b", "a").unwrap();
    assert!(!cluster.is_validated());

    let order = drive(&mut cluster, &HashSet::new(), 10);
    assert_eq!(order, vec![id("n", "a"), id("n", "b")]);
}

#[test]
fn reporter_sees_every_round_and_change() {
    let reporter = RecordingReporter::new();
    let mut cluster = ClusterBuilder::new("c")
        .reporter(reporter.clone())
        .node(
            NodeBuilder::new("n")
                .task(TaskBuilder::new("a"))
                .task(TaskBuilder::new("b").after("a")),
        )
        .build();

    let failing = HashSet::from([id("n", "a")]);
    drive(&mut cluster, &failing, 10);

    let rounds = reporter.rounds();
    assert_eq!(rounds.len() as u64, cluster.round());
    assert_eq!(rounds[0].round, 1);

    let changes = reporter.changes();
    assert!(changes.contains(&(id("n", "a"), TaskStatus::Running)));
    assert!(changes.contains(&(id("n", "a"), TaskStatus::Failed)));
    assert!(changes.contains(&(id("n", "b"), TaskStatus::DepFailed)));
}

#[test]
fn snapshot_reflects_current_state() {
    let mut cluster = ClusterBuilder::new("prod")
        .node(
            NodeBuilder::new("n")
                .task(TaskBuilder::new("a"))
                .task(TaskBuilder::new("b").after("a")),
        )
        .build();
    cluster.step().unwrap();

    let snap = cluster.snapshot();
    assert_eq!(snap.name, "prod");
    assert_eq!(snap.round, 1);
    assert_eq!(snap.status_of(&id("n", "a")), Some(TaskStatus::Running));
    assert_eq!(snap.status_of(&id("n", "b")), Some(TaskStatus::Pending));
    assert_eq!(snap.tasks().count(), 2);
}
