// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::Result;

/// Load a plan file and return it unvalidated.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// the structural checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let plan: RawPlanFile = toml::from_str(&contents)?;
    Ok(plan)
}

/// Load a plan file and check it:
///
/// - at least one node,
/// - no `/` in node or task names,
/// - every `after` entry names an existing task, and not the task itself.
///
/// Cycles are reported when the plan is turned into a cluster with
/// [`PlanFile::build_cluster`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let raw = load_from_path(&path)?;
    PlanFile::try_from(raw)
}

/// `Fleet.toml` in the current working directory.
pub fn default_plan_path() -> PathBuf {
    PathBuf::from("Fleet.toml")
}
