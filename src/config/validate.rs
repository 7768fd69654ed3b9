// src/config/validate.rs

use crate::config::model::{PlanFile, RawPlanFile};
use crate::dag::{TaskRef, RUNNING_NODES};
use crate::errors::{FleetError, Result};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = FleetError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw))
    }
}

/// Structural checks that do not need a built cluster.
///
/// Cycles are left to [`crate::dag::Cluster::validate`], which reports the
/// offending path.
fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_nodes(plan)?;
    validate_names(plan)?;
    validate_counters(plan)?;
    validate_dependencies(plan)?;
    Ok(())
}

fn ensure_has_nodes(plan: &RawPlanFile) -> Result<()> {
    if plan.node.is_empty() {
        return Err(FleetError::ConfigError(
            "plan must contain at least one [node.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(plan: &RawPlanFile) -> Result<()> {
    for (node, cfg) in plan.node.iter() {
        if node.contains('/') {
            return Err(FleetError::ConfigError(format!(
                "node name '{node}' must not contain '/'"
            )));
        }
        for task in cfg.task.keys() {
            if task.contains('/') {
                return Err(FleetError::ConfigError(format!(
                    "task name '{node}/{task}' must not contain '/'"
                )));
            }
        }
    }
    Ok(())
}

/// Counter names must be non-empty, and `running_nodes` is reserved for
/// `[cluster] max_running_nodes`.
fn validate_counters(plan: &RawPlanFile) -> Result<()> {
    if plan.counters.contains_key(RUNNING_NODES) {
        return Err(FleetError::ConfigError(format!(
            "counter '{RUNNING_NODES}' is reserved; use [cluster] max_running_nodes"
        )));
    }
    for (node, cfg) in plan.node.iter() {
        for (task, task_cfg) in cfg.task.iter() {
            if task_cfg.counters.iter().any(|c| c.is_empty()) {
                return Err(FleetError::ConfigError(format!(
                    "task '{node}/{task}' lists an empty counter name"
                )));
            }
            if task_cfg.counters.iter().any(|c| c == RUNNING_NODES) {
                return Err(FleetError::ConfigError(format!(
                    "task '{node}/{task}' lists reserved counter '{RUNNING_NODES}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dependencies(plan: &RawPlanFile) -> Result<()> {
    for (node, cfg) in plan.node.iter() {
        for (task, task_cfg) in cfg.task.iter() {
            for dep in task_cfg.after.iter() {
                let target = dep
                    .parse::<TaskRef>()
                    .map_err(|e| FleetError::ConfigError(format!("task '{node}/{task}': {e}")))?
                    .resolve(node);

                let exists = plan
                    .node
                    .get(&target.node)
                    .is_some_and(|n| n.task.contains_key(&target.task));
                if !exists {
                    return Err(FleetError::ConfigError(format!(
                        "task '{node}/{task}' has unknown dependency '{dep}' in `after`"
                    )));
                }
                if target.node == *node && target.task == *task {
                    return Err(FleetError::ConfigError(format!(
                        "task '{node}/{task}' cannot depend on itself in `after`"
                    )));
                }
            }
        }
    }
    Ok(())
}
