// src/config/mod.rs

//! Deployment plan files.
//!
//! Responsibilities:
//! - Define the TOML-backed plan model (`model.rs`).
//! - Load a plan from disk (`loader.rs`).
//! - Check structural invariants before a cluster is built (`validate.rs`).
//! - Payload helpers for `[default]` handling (`payload.rs`).

pub mod loader;
pub mod model;
pub mod payload;
pub mod validate;

pub use loader::{default_plan_path, load_and_validate, load_from_path};
pub use model::{ClusterSection, NodeConfig, PlanFile, RawPlanFile, TaskConfig};
pub use payload::{compact_blank, merge_defaults};
