// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::{Cluster, Node, Payload, TaskRef};
use crate::errors::Result;
use crate::report::{ClusterOptions, Context};
use crate::types::ExecutorKind;

use super::payload::{compact_blank, merge_defaults};

/// Plan exactly as read from TOML, before validation.
///
/// ```toml
/// [cluster]
/// name = "prod"
/// max_running_nodes = 2
///
/// [counters]
/// reboot = 1
///
/// [default]
/// env = { LANG = "C" }
///
/// [node.web-1.task.install]
/// cmd = "apt-get install -y nginx"
/// after = ["db-1/migrate"]
/// counters = ["reboot"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPlanFile {
    #[serde(default)]
    pub cluster: ClusterSection,

    /// Named counters and their maximums (leniently coerced).
    #[serde(default)]
    pub counters: BTreeMap<String, toml::Value>,

    /// Payload defaults merged into every task.
    #[serde(default)]
    pub default: toml::Table,

    /// All nodes from `[node.<name>]`.
    #[serde(default)]
    pub node: BTreeMap<String, NodeConfig>,
}

/// A validated plan. Build one with `PlanFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub cluster: ClusterSection,
    pub counters: BTreeMap<String, toml::Value>,
    pub default: toml::Table,
    pub node: BTreeMap<String, NodeConfig>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(raw: RawPlanFile) -> Self {
        Self {
            cluster: raw.cluster,
            counters: raw.counters,
            default: raw.default,
            node: raw.node,
        }
    }

    /// Payload handed to the executor for one task: the task's own keys,
    /// completed from `[default]`, with blank values dropped.
    pub fn payload_for(&self, task: &TaskConfig) -> Payload {
        let mut payload = task.payload.clone();
        merge_defaults(&mut payload, &self.default);
        compact_blank(&mut payload);
        payload
    }

    pub fn options(&self) -> ClusterOptions {
        ClusterOptions {
            fail_fast: self.cluster.fail_fast,
        }
    }

    /// Build and validate the cluster described by this plan.
    ///
    /// Tasks marked `skip = true` are skipped before the first round.
    pub fn build_cluster(&self, ctx: Context) -> Result<Cluster> {
        let mut cluster = Cluster::with_context(self.cluster.name.clone(), ctx);

        if let Some(max) = &self.cluster.max_running_nodes {
            cluster.limit_running_nodes(max)?;
        }
        for (name, maximum) in &self.counters {
            cluster.counters_mut().create(name, maximum, 0)?;
        }

        for (node_name, node_cfg) in &self.node {
            let mut node = Node::new(node_name.clone()).with_concurrency(node_cfg.concurrency);

            for (task_name, task_cfg) in &node_cfg.task {
                let task = node.add_task(task_name.clone(), self.payload_for(task_cfg))?;
                for counter in &task_cfg.counters {
                    task.add_counter(counter)?;
                }
            }
            for (task_name, task_cfg) in &node_cfg.task {
                for dep in &task_cfg.after {
                    node.add_dependency(task_name, dep.parse::<TaskRef>()?)?;
                }
            }

            cluster.add_node(node)?;
        }

        cluster.validate()?;

        for (node_name, node_cfg) in &self.node {
            for (task_name, _) in node_cfg.task.iter().filter(|(_, t)| t.skip) {
                cluster.skip(node_name, task_name)?;
            }
        }

        Ok(cluster)
    }
}

/// `[cluster]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterSection {
    #[serde(default = "default_cluster_name")]
    pub name: String,

    /// Abort every node on the first task failure.
    #[serde(default)]
    pub fail_fast: bool,

    /// How many nodes may have a running task at once; absent or `0` means
    /// unlimited.
    #[serde(default)]
    pub max_running_nodes: Option<toml::Value>,

    #[serde(default)]
    pub executor: ExecutorKind,
}

fn default_cluster_name() -> String {
    "cluster".to_string()
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            name: default_cluster_name(),
            fail_fast: false,
            max_running_nodes: None,
            executor: ExecutorKind::default(),
        }
    }
}

/// `[node.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Tasks allowed to run at once on this node; `0` means unlimited.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

fn default_concurrency() -> usize {
    crate::dag::DEFAULT_NODE_CONCURRENCY
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            task: BTreeMap::new(),
        }
    }
}

/// `[node.<name>.task.<task>]` section.
///
/// Scheduling keys are read here; everything else becomes the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Predecessors: `"task"` on the same node or `"node/task"`.
    #[serde(default)]
    pub after: Vec<String>,

    /// Counters that must admit the task before dispatch.
    #[serde(default)]
    pub counters: Vec<String>,

    /// Skip the task before the run starts.
    #[serde(default)]
    pub skip: bool,

    #[serde(flatten)]
    pub payload: toml::Table,
}
