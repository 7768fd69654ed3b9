// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod export;
pub mod limits;
pub mod logging;
pub mod report;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{PlanFile, load_and_validate};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::exec::backend_for;
use crate::report::Context;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading and cluster construction
/// - Graphviz export or dry-run output (both exit without running)
/// - core runtime + shell executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let plan_path = PathBuf::from(&args.plan);
    let plan = load_and_validate(&plan_path)
        .with_context(|| format!("loading plan '{}'", plan_path.display()))?;

    let cluster = plan.build_cluster(Context::with_options(plan.options()))?;

    if let Some(target) = &args.dot {
        let dot = export::to_dot(&cluster.snapshot());
        if target == "-" {
            println!("{dot}");
        } else {
            std::fs::write(target, dot)
                .with_context(|| format!("writing graph to '{target}'"))?;
            info!(path = %target, "task graph written");
        }
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = backend_for(plan.cluster.executor, rt_tx.clone())?;

    // Ctrl-C → graceful shutdown; a second Ctrl-C stops immediately.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                if tx.send(RuntimeEvent::ShutdownRequested).await.is_err() {
                    return;
                }
            }
        });
    }

    let core = CoreRuntime::new(cluster);
    let runtime = Runtime::new(core, rt_rx, executor);
    let summary = runtime.run().await?;

    if summary.deadlocked {
        bail!("run deadlocked after {} rounds", summary.rounds);
    }
    if !summary.is_successful() {
        let failed: Vec<String> = summary
            .nodes
            .iter()
            .flat_map(|n| n.tasks.iter())
            .filter(|t| t.status.is_failure())
            .map(|t| t.id.to_string())
            .collect();
        bail!("run {}; failed tasks: {}", summary.status, failed.join(", "));
    }

    info!(rounds = summary.rounds, "run successful");
    Ok(())
}

/// Simple dry-run output: print nodes, tasks, deps and payloads.
fn print_dry_run(plan: &PlanFile) {
    println!("fleetdag dry-run");
    println!("  cluster.name = {}", plan.cluster.name);
    println!("  cluster.fail_fast = {}", plan.cluster.fail_fast);
    println!("  cluster.executor = {}", plan.cluster.executor);
    if let Some(max) = &plan.cluster.max_running_nodes {
        println!("  cluster.max_running_nodes = {max}");
    }
    for (name, maximum) in &plan.counters {
        println!("  counters.{name} = {maximum}");
    }
    println!();

    println!("nodes ({}):", plan.node.len());
    for (node_name, node) in &plan.node {
        println!("  - {node_name} (concurrency {})", node.concurrency);
        for (task_name, task) in &node.task {
            println!("      - {task_name}");
            let payload = plan.payload_for(task);
            if let Some(cmd) = payload.get("cmd").and_then(|v| v.as_str()) {
                println!("          cmd: {cmd}");
            }
            if !task.after.is_empty() {
                println!("          after: {:?}", task.after);
            }
            if !task.counters.is_empty() {
                println!("          counters: {:?}", task.counters);
            }
            if task.skip {
                println!("          skip: true");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
