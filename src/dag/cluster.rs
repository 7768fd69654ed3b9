// src/dag/cluster.rs

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use crate::dag::graph::{DependencyLookup, StatusIndex, StatusLookup};
use crate::dag::node::Node;
use crate::dag::snapshot::ClusterSnapshot;
use crate::dag::task::{NodeName, Payload, TaskId};
use crate::errors::{FleetError, Result};
use crate::limits::{Group, IntoKey, Key, ToCount};
use crate::report::Context;
use crate::types::{RunStatus, TaskOutcome, TaskStatus};

/// Counter key used by [`Cluster::limit_running_nodes`].
pub const RUNNING_NODES: &str = "running_nodes";

/// A task the cluster wants the executor to run now.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub task: TaskId,
    pub payload: Payload,
}

/// Result of one [`Cluster::step`].
#[derive(Debug, Clone)]
pub struct Round {
    pub number: u64,
    /// Tasks that became ready since the previous round.
    pub newly_ready: Vec<TaskId>,
    /// Tasks admitted and marked running in this round.
    pub dispatched: Vec<Dispatch>,
    pub status: RunStatus,
    /// Nothing was dispatched, nothing is in flight and some node is not
    /// finished: no report can arrive to unblock the run.
    pub deadlock: bool,
}

/// All nodes of one deployment run plus the counters gating dispatch.
///
/// The cluster never runs anything itself. A driver calls [`Cluster::step`]
/// to collect admitted tasks, hands them to an executor, and feeds the
/// outcomes back through [`Cluster::report`].
#[derive(Debug)]
pub struct Cluster {
    name: String,
    ctx: Context,
    nodes: Vec<Node>,
    index: HashMap<NodeName, usize>,
    counters: Group,
    /// Counter that limits how many nodes may have a running task.
    node_limit: Option<Key>,
    /// Dependents of every task across all nodes, in declaration order.
    successors: HashMap<TaskId, Vec<TaskId>>,
    /// Counters held by tasks that are in flight.
    reserved: HashMap<TaskId, Vec<Key>>,
    /// Nodes currently holding a slot in the `node_limit` counter.
    busy_nodes: HashSet<NodeName>,
    /// Promotions since the last round, drained by [`Cluster::step`].
    newly_ready: Vec<TaskId>,
    validated: bool,
    aborted: bool,
    round: u64,
}

impl Cluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_context(name, Context::default())
    }

    pub fn with_context(name: impl Into<String>, ctx: Context) -> Self {
        Self {
            name: name.into(),
            ctx,
            nodes: Vec::new(),
            index: HashMap::new(),
            counters: Group::new(),
            node_limit: None,
            successors: HashMap::new(),
            reserved: HashMap::new(),
            busy_nodes: HashSet::new(),
            newly_ready: Vec::new(),
            validated: false,
            aborted: false,
            round: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn add_node(&mut self, node: Node) -> Result<&mut Node> {
        if node.name().is_empty() {
            return Err(FleetError::InvalidArgument(
                "node names must not be empty".to_string(),
            ));
        }
        if self.index.contains_key(node.name()) {
            return Err(FleetError::InvalidArgument(format!(
                "node '{}' is already part of cluster '{}'",
                node.name(),
                self.name
            )));
        }

        let position = self.nodes.len();
        self.index.insert(node.name().to_string(), position);
        self.nodes.push(node);
        self.validated = false;
        Ok(&mut self.nodes[position])
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Mutable access invalidates the last validation; the next
    /// [`Cluster::step`] validates again.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        let i = *self.index.get(name)?;
        self.validated = false;
        Some(&mut self.nodes[i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn counters(&self) -> &Group {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut Group {
        &mut self.counters
    }

    /// Allow at most `maximum` nodes to have a running task at once
    /// (`0` removes the limit).
    pub fn limit_running_nodes(&mut self, maximum: impl ToCount) -> Result<()> {
        let key = RUNNING_NODES.into_key()?;
        self.counters
            .create(key.clone(), maximum, self.busy_nodes.len())?;
        self.node_limit = Some(key);
        Ok(())
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Check every node's graph before anything is dispatched.
    ///
    /// Fails with [`FleetError::NoSuchTask`] for dangling dependencies and
    /// with [`FleetError::LoopDetected`] for cycles, including cycles that
    /// run through several nodes.
    pub fn validate(&mut self) -> Result<()> {
        self.successors = self.build_successors();

        let lookup: &Cluster = self;
        for node in &lookup.nodes {
            node.graph().validate_with(lookup)?;
        }

        let keys: Vec<Key> = self
            .nodes
            .iter()
            .flat_map(|n| n.graph().tasks())
            .flat_map(|t| t.counters().iter().cloned())
            .collect();
        for key in keys {
            self.counters.get(key)?;
        }

        self.validated = true;
        let ready = self.refresh();
        info!(
            cluster = %self.name,
            nodes = self.nodes.len(),
            ready,
            "cluster validated"
        );
        Ok(())
    }

    fn build_successors(&self) -> HashMap<TaskId, Vec<TaskId>> {
        let mut successors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for task in self.nodes.iter().flat_map(|n| n.graph().tasks()) {
            for dep in task.dependencies() {
                successors
                    .entry(dep.clone())
                    .or_default()
                    .push(task.id().clone());
            }
        }
        successors
    }

    pub fn status_index(&self) -> StatusIndex {
        self.nodes
            .iter()
            .flat_map(|n| n.graph().tasks())
            .map(|t| (t.id().clone(), t.status()))
            .collect()
    }

    /// Promote pending tasks whose predecessors (on any node) are done.
    ///
    /// Returns how many tasks were promoted.
    fn refresh(&mut self) -> usize {
        let statuses = self.status_index();
        let before = self.newly_ready.len();
        for node in &mut self.nodes {
            for name in node.graph_mut().refresh_readiness(&statuses) {
                self.newly_ready.push(TaskId::new(node.name(), name));
            }
        }
        self.newly_ready.len() - before
    }

    /// One pass of the scheduling loop.
    ///
    /// Validates on first use, then asks every unfinished node for ready
    /// tasks and dispatches each one its counters admit. A node keeps
    /// handing out tasks until it has no ready task, reaches its own
    /// concurrency limit, or a counter refuses.
    pub fn step(&mut self) -> Result<Round> {
        if !self.validated {
            self.validate()?;
        }

        self.round += 1;
        self.refresh();
        let newly_ready = std::mem::take(&mut self.newly_ready);
        let mut dispatched = Vec::new();

        if !self.aborted {
            for i in 0..self.nodes.len() {
                while let Some(dispatch) = self.dispatch_next(i)? {
                    dispatched.push(dispatch);
                }
            }
        }

        let deadlock = dispatched.is_empty() && self.in_flight() == 0 && !self.is_finished();
        if deadlock {
            warn!(
                cluster = %self.name,
                round = self.round,
                "no task can be dispatched and none is running; run is stuck"
            );
        }

        let round = Round {
            number: self.round,
            newly_ready,
            dispatched,
            status: self.status(),
            deadlock,
        };

        self.ctx.reporter.round_finished(&self.snapshot());
        Ok(round)
    }

    fn dispatch_next(&mut self, i: usize) -> Result<Option<Dispatch>> {
        let node = &self.nodes[i];
        let Some(task) = node.next_task() else {
            return Ok(None);
        };

        let id = task.id().clone();
        let payload = task.payload().clone();
        let task_keys = task.counters().to_vec();

        let node_key = match &self.node_limit {
            Some(key) if !self.busy_nodes.contains(node.name()) => Some(key.clone()),
            _ => None,
        };

        let mut keys = task_keys.clone();
        keys.extend(node_key.iter().cloned());

        if !self.counters.try_acquire(&keys) {
            debug!(task = %id, "admission refused; retrying next round");
            return Ok(None);
        }

        self.nodes[i].start(&id.task)?;
        if node_key.is_some() {
            self.busy_nodes.insert(id.node.clone());
        }
        self.reserved.insert(id.clone(), task_keys);
        self.ctx.reporter.task_changed(&id, TaskStatus::Running);

        Ok(Some(Dispatch { task: id, payload }))
    }

    /// Apply an executor report.
    ///
    /// Releases the counters the task held, cascades a failure to every
    /// dependent on any node, and recomputes readiness. Reports for tasks
    /// that are not running (never dispatched, duplicate, or already marked
    /// `DepFailed`) return `Ok(false)` and change nothing else.
    pub fn report(&mut self, node: &str, task: &str, outcome: TaskOutcome) -> Result<bool> {
        let i = self.node_position(node, task)?;
        let id = TaskId::new(node, task);

        if let Some(keys) = self.reserved.remove(&id) {
            self.counters.release(&keys);
        }

        let mut changed = self.nodes[i].apply_report(task, outcome)?;
        self.release_node_slot(i);

        if changed.is_empty() {
            return Ok(false);
        }

        if outcome != TaskOutcome::Success {
            let mut cascaded = self.cascade_failure(&changed);
            changed.append(&mut cascaded);
        }
        self.notify(&changed);

        if outcome != TaskOutcome::Success && self.ctx.options.fail_fast {
            warn!(task = %id, "fail_fast is set; aborting cluster");
            self.abort();
        }

        self.refresh();
        Ok(true)
    }

    /// Mark a pending or ready task skipped; dependents treat it as done.
    pub fn skip(&mut self, node: &str, task: &str) -> Result<bool> {
        let i = self.node_position(node, task)?;
        let skipped = self.nodes[i].skip(task)?;
        if skipped {
            self.notify(&[TaskId::new(node, task)]);
            self.refresh();
        }
        Ok(skipped)
    }

    fn node_position(&self, node: &str, task: &str) -> Result<usize> {
        self.index
            .get(node)
            .copied()
            .ok_or_else(|| FleetError::NoSuchTask(TaskId::new(node, task).to_string()))
    }

    /// Give back the node's `node_limit` slot once none of its tasks are
    /// in flight. A task cascaded to `DepFailed` while running stays in
    /// flight until its executor reports.
    fn release_node_slot(&mut self, i: usize) {
        let name = self.nodes[i].name();
        if self.reserved.keys().any(|id| id.node == name) || !self.busy_nodes.remove(name) {
            return;
        }
        if let Some(key) = &self.node_limit {
            self.counters.release(std::slice::from_ref(key));
        }
    }

    /// Follow dependents across nodes from tasks that just failed.
    ///
    /// Terminal tasks are walked through rather than stopping the cascade,
    /// so dependents behind a skipped task are still reached.
    fn cascade_failure(&mut self, seeds: &[TaskId]) -> Vec<TaskId> {
        let mut queue: VecDeque<TaskId> = seeds.iter().cloned().collect();
        let mut visited: HashSet<TaskId> = seeds.iter().cloned().collect();
        let mut changed = Vec::new();

        while let Some(id) = queue.pop_front() {
            let dependents = self.successors.get(&id).cloned().unwrap_or_default();
            for dependent in dependents {
                if !visited.insert(dependent.clone()) {
                    continue;
                }
                let Some(&i) = self.index.get(&dependent.node) else {
                    continue;
                };
                let newly_failed = self.nodes[i]
                    .graph_mut()
                    .task_mut(&dependent.task)
                    .is_some_and(|t| t.transition(TaskStatus::DepFailed));
                if newly_failed {
                    debug!(task = %dependent, upstream = %id, "marking dependent as dep_failed");
                    changed.push(dependent.clone());
                }
                queue.push_back(dependent);
            }
        }

        changed
    }

    fn notify(&self, changed: &[TaskId]) {
        for id in changed {
            if let Some(status) = self.status_of(id) {
                self.ctx.reporter.task_changed(id, status);
            }
        }
    }

    /// Stop dispatching on every node. Running tasks keep their slots until
    /// they report.
    pub fn abort(&mut self) {
        if !self.aborted {
            warn!(cluster = %self.name, "cluster aborted");
        }
        self.aborted = true;
        for node in &mut self.nodes {
            node.abort();
        }
    }

    pub fn abort_node(&mut self, name: &str) -> Result<()> {
        let i = *self.index.get(name).ok_or_else(|| {
            FleetError::InvalidArgument(format!("unknown node '{name}'"))
        })?;
        self.nodes[i].abort();
        Ok(())
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn running_count(&self) -> usize {
        self.nodes.iter().map(Node::running_count).sum()
    }

    /// Dispatched tasks whose executor has not reported yet, including
    /// running tasks a failure cascade already marked `DepFailed`.
    pub fn in_flight(&self) -> usize {
        self.reserved.len()
    }

    pub fn is_finished(&self) -> bool {
        self.nodes.iter().all(Node::is_finished)
    }

    /// Aggregated status.
    ///
    /// `Successful` once every node is; `Failed` when a node failed and
    /// either `fail_fast` is set or every node has finished; `Pending`
    /// before the first round; `Running` otherwise.
    pub fn status(&self) -> RunStatus {
        if self.nodes.iter().all(|n| n.status() == RunStatus::Successful) {
            return RunStatus::Successful;
        }

        let any_failed = self.nodes.iter().any(|n| n.status() == RunStatus::Failed);
        if any_failed && (self.ctx.options.fail_fast || self.is_finished()) {
            RunStatus::Failed
        } else if self.round == 0 {
            RunStatus::Pending
        } else {
            RunStatus::Running
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            name: self.name.clone(),
            round: self.round,
            status: self.status(),
            nodes: self.nodes.iter().map(Node::snapshot).collect(),
        }
    }
}

impl StatusLookup for Cluster {
    fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.node(&id.node)
            .and_then(|n| n.task(&id.task))
            .map(|t| t.status())
    }
}

impl DependencyLookup for Cluster {
    fn contains_task(&self, id: &TaskId) -> bool {
        self.node(&id.node)
            .is_some_and(|n| n.task(&id.task).is_some())
    }

    fn dependents_of(&self, id: &TaskId) -> Vec<TaskId> {
        self.successors.get(id).cloned().unwrap_or_default()
    }
}
