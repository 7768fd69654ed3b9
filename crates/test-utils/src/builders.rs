#![allow(dead_code)]

use std::sync::Arc;

use fleetdag::dag::{Cluster, Node, Payload};
use fleetdag::report::{ClusterOptions, Context, StatusReporter};

/// Payload with just a `cmd` entry.
pub fn payload(cmd: &str) -> Payload {
    let mut table = Payload::new();
    table.insert("cmd".to_string(), toml::Value::String(cmd.to_string()));
    table
}

/// Builder for `Cluster` to simplify test setup.
///
/// `build()` does not validate; the first `step()` does.
pub struct ClusterBuilder {
    name: String,
    options: ClusterOptions,
    reporter: Option<Arc<dyn StatusReporter>>,
    running_nodes: Option<u64>,
    counters: Vec<(String, u64)>,
    nodes: Vec<NodeBuilder>,
}

impl ClusterBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: ClusterOptions::default(),
            reporter: None,
            running_nodes: None,
            counters: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn fail_fast(mut self, val: bool) -> Self {
        self.options.fail_fast = val;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn limit_running_nodes(mut self, max: u64) -> Self {
        self.running_nodes = Some(max);
        self
    }

    pub fn counter(mut self, name: &str, max: u64) -> Self {
        self.counters.push((name.to_string(), max));
        self
    }

    pub fn node(mut self, node: NodeBuilder) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn build(self) -> Cluster {
        let ctx = match self.reporter {
            Some(reporter) => Context::new(reporter, self.options),
            None => Context::with_options(self.options),
        };
        let mut cluster = Cluster::with_context(self.name, ctx);

        if let Some(max) = self.running_nodes {
            cluster
                .limit_running_nodes(max)
                .expect("Failed to limit running nodes");
        }
        for (name, max) in self.counters {
            cluster
                .counters_mut()
                .create(name, max, 0u64)
                .expect("Failed to create counter");
        }
        for node in self.nodes {
            cluster
                .add_node(node.build())
                .expect("Failed to add node from builder");
        }
        cluster
    }

    /// Build and run `Cluster::validate`, panicking on failure.
    pub fn build_validated(self) -> Cluster {
        let mut cluster = self.build();
        cluster.validate().expect("Failed to validate cluster from builder");
        cluster
    }
}

/// Builder for `Node`.
pub struct NodeBuilder {
    name: String,
    concurrency: usize,
    tasks: Vec<TaskBuilder>,
}

impl NodeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            concurrency: fleetdag::dag::DEFAULT_NODE_CONCURRENCY,
            tasks: Vec::new(),
        }
    }

    /// `0` means unlimited.
    pub fn concurrency(mut self, val: usize) -> Self {
        self.concurrency = val;
        self
    }

    pub fn task(mut self, task: TaskBuilder) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn build(self) -> Node {
        let mut node = Node::new(self.name).with_concurrency(self.concurrency);

        for t in &self.tasks {
            let task = node
                .add_task(t.name.clone(), t.payload.clone())
                .expect("Failed to add task from builder");
            for key in &t.counters {
                task.add_counter(key.as_str())
                    .expect("Failed to add counter from builder");
            }
        }
        for t in &self.tasks {
            for dep in &t.after {
                let dep = dep
                    .parse::<fleetdag::dag::TaskRef>()
                    .expect("Invalid dependency in builder");
                node.add_dependency(&t.name, dep)
                    .expect("Failed to add dependency from builder");
            }
        }
        node
    }
}

/// Builder for one task inside a `NodeBuilder`.
pub struct TaskBuilder {
    name: String,
    payload: Payload,
    after: Vec<String>,
    counters: Vec<String>,
}

impl TaskBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            payload: payload(&format!("echo {name}")),
            after: Vec::new(),
            counters: Vec::new(),
        }
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.payload = payload(cmd);
        self
    }

    /// `"task"` on the same node or `"node/task"`.
    pub fn after(mut self, dep: &str) -> Self {
        self.after.push(dep.to_string());
        self
    }

    pub fn counter(mut self, key: &str) -> Self {
        self.counters.push(key.to_string());
        self
    }
}
