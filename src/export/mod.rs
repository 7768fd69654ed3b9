// src/export/mod.rs

//! Read-only renderings of cluster snapshots.

pub mod dot;

pub use dot::to_dot;
