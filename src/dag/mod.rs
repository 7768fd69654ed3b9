// src/dag/mod.rs

//! Task graphs and scheduling.
//!
//! - [`task`] holds task identities and the per-task state machine.
//! - [`graph`] holds one node's tasks and edges, readiness and loop
//!   detection.
//! - [`node`] wraps a graph with a concurrency limit and aggregated status.
//! - [`cluster`] owns all nodes and the counters that gate dispatch, and
//!   drives the scheduling rounds.
//! - [`snapshot`] provides read-only views for reporters and exporters.

pub mod cluster;
pub mod graph;
pub mod node;
pub mod snapshot;
pub mod task;

pub use cluster::{Cluster, Dispatch, Round, RUNNING_NODES};
pub use graph::{DependencyLookup, Graph, StatusIndex, StatusLookup};
pub use node::{Node, DEFAULT_NODE_CONCURRENCY};
pub use snapshot::{ClusterSnapshot, NodeSnapshot, TaskSnapshot};
pub use task::{NodeName, Payload, Task, TaskId, TaskName, TaskRef};
