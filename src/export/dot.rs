// src/export/dot.rs

//! Graphviz rendering of a [`ClusterSnapshot`].

use std::collections::HashMap;
use std::fmt;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::{ClusterSnapshot, TaskId};
use crate::types::TaskStatus;

/// Vertex weight: label text plus the status used for colouring.
#[derive(Debug, Clone)]
struct Vertex {
    id: TaskId,
    status: TaskStatus,
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.id, self.status)
    }
}

fn colour(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "grey",
        TaskStatus::Ready => "yellow",
        TaskStatus::Running => "blue",
        TaskStatus::Successful => "green",
        TaskStatus::Failed => "red",
        TaskStatus::DepFailed => "orange",
        TaskStatus::Skipped => "violet",
    }
}

/// Render every task as a vertex and every dependency as an edge from
/// predecessor to dependent.
///
/// Dependencies on tasks missing from the snapshot are left out.
pub fn to_dot(snapshot: &ClusterSnapshot) -> String {
    // Edge weights are never printed (`EdgeNoLabel`) but must be `Display`.
    let mut graph: DiGraph<Vertex, &'static str> = DiGraph::new();
    let mut vertices: HashMap<&TaskId, NodeIndex> = HashMap::new();

    for task in snapshot.tasks() {
        let idx = graph.add_node(Vertex {
            id: task.id.clone(),
            status: task.status,
        });
        vertices.insert(&task.id, idx);
    }

    for task in snapshot.tasks() {
        let Some(&to) = vertices.get(&task.id) else {
            continue;
        };
        for dep in &task.dependencies {
            if let Some(&from) = vertices.get(dep) {
                graph.add_edge(from, to, "");
            }
        }
    }

    let dot = Dot::with_attr_getters(
        &graph,
        &[Config::EdgeNoLabel],
        &|_, _| String::new(),
        &|_, (_, vertex)| format!("color={} shape=box", colour(vertex.status)),
    );
    format!("{dot}")
}
