// src/limits/mod.rs

//! Concurrency admission primitives.
//!
//! - [`counter`] holds [`Counter`], a current value checked against an
//!   optional maximum, and the lenient [`ToCount`] conversion.
//! - [`group`] holds [`Group`], a registry of counters keyed by canonical
//!   [`Key`]s that creates unlimited counters on first use.

pub mod counter;
pub mod group;

pub use counter::{Counter, ToCount};
pub use group::{Group, IntoKey, Key};
