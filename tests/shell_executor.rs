// tests/shell_executor.rs

#![cfg(unix)]

mod common;
use crate::common::{
    id, init_tracing, payload, with_timeout, ClusterBuilder, NodeBuilder, TaskBuilder,
};

use tokio::sync::mpsc;

use fleetdag::dag::{Dispatch, Payload};
use fleetdag::engine::{CoreRuntime, Runtime, RuntimeEvent};
use fleetdag::exec::task_runner::run_task;
use fleetdag::exec::ShellExecutorBackend;
use fleetdag::types::{RunStatus, TaskOutcome};

async fn outcome_of(payload: Payload) -> TaskOutcome {
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(4);
    let dispatch = Dispatch {
        task: id("web", "build"),
        payload,
    };

    with_timeout(run_task(dispatch, tx)).await;

    match rx.recv().await {
        Some(RuntimeEvent::TaskCompleted { task, outcome }) => {
            assert_eq!(task, id("web", "build"));
            outcome
        }
        other => panic!("expected TaskCompleted, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_exit_is_success() {
    init_tracing();
    assert_eq!(outcome_of(payload("true")).await, TaskOutcome::Success);
}

#[tokio::test]
async fn exit_code_is_reported() {
    init_tracing();
    assert_eq!(outcome_of(payload("exit 3")).await, TaskOutcome::Failed(3));
}

#[tokio::test]
async fn task_identity_is_exported_to_the_process() {
    init_tracing();
    let script = r#"test "$FLEETDAG_NODE" = web && test "$FLEETDAG_TASK" = build"#;
    assert_eq!(outcome_of(payload(script)).await, TaskOutcome::Success);
}

#[tokio::test]
async fn missing_cmd_fails_without_spawning() {
    init_tracing();
    assert_eq!(outcome_of(Payload::new()).await, TaskOutcome::Failed(-1));

    let mut bad = Payload::new();
    bad.insert("cmd".to_string(), toml::Value::Integer(1));
    assert_eq!(outcome_of(bad).await, TaskOutcome::Failed(-1));
}

#[tokio::test]
async fn shell_backend_runs_a_plan_end_to_end() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("done");
    let cluster = ClusterBuilder::new("c")
        .node(
            NodeBuilder::new("n")
                .task(TaskBuilder::new("touch").cmd(&format!("touch {}", marker.display())))
                .task(
                    TaskBuilder::new("check")
                        .cmd(&format!("test -f {}", marker.display()))
                        .after("touch"),
                ),
        )
        .build();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let backend = ShellExecutorBackend::new(rt_tx);
    let summary = with_timeout(Runtime::new(CoreRuntime::new(cluster), rt_rx, backend).run())
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Successful);
}
