// src/exec/task_runner.rs

//! Individual task process runner.

use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::{Dispatch, TaskId};
use crate::engine::RuntimeEvent;
use crate::types::TaskOutcome;

/// Environment variable carrying the node name into the task process.
pub const NODE_ENV: &str = "FLEETDAG_NODE";
/// Environment variable carrying the task name into the task process.
pub const TASK_ENV: &str = "FLEETDAG_TASK";

/// Run a single task process and always emit exactly one `TaskCompleted`.
///
/// Anything that prevents the process from running (missing `cmd`, spawn
/// error) is reported as `Failed(-1)`.
pub async fn run_task(dispatch: Dispatch, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let task = dispatch.task.clone();
    let outcome = match run_task_inner(&dispatch).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(task = %task, error = %err, "task execution error");
            TaskOutcome::Failed(-1)
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        debug!(task = %task, "runtime gone; dropping task completion");
    }
}

async fn run_task_inner(dispatch: &Dispatch) -> Result<TaskOutcome> {
    let id = &dispatch.task;
    let script = dispatch
        .payload
        .get("cmd")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("task '{id}' has no string 'cmd' in its payload"))?;

    info!(task = %id, cmd = %script, "starting task process");

    let mut cmd = shell_command(script);
    cmd.env(NODE_ENV, &id.node)
        .env(TASK_ENV, &id.task)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = dispatch.payload.get("cwd").and_then(|v| v.as_str()) {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{id}'"))?;

    if let Some(stdout) = child.stdout.take() {
        forward_lines(id.clone(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(id.clone(), "stderr", stderr);
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{id}'"))?;

    let code = status.code().unwrap_or(-1);
    info!(
        task = %id,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    })
}

fn shell_command(script: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(script);
        c
    }
}

/// Drain a child pipe so its buffer never fills; lines go to the log.
fn forward_lines<R>(task: TaskId, stream: &'static str, reader: R)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(task = %task, stream, "{line}");
        }
    });
}
