//! Global replication group update planning
//!
//! The remote API accepts one property change per modify request, so every
//! changed property becomes its own operation. Node-group count changes use
//! dedicated increase/decrease calls.

use super::PlannedOperation;
use crate::diff::{DiffExt, ResourceDiff};
use crate::error::{CoreError, Result};
use crate::model::{GlobalReplicationGroup, ModifyGlobalReplicationGroupInput};
use crate::version::ENGINE_VERSION_FIELD;

pub mod fields {
    pub const DESCRIPTION: &str = "global_replication_group_description";
    pub const AUTOMATIC_FAILOVER_ENABLED: &str = "automatic_failover_enabled";
    pub const CACHE_NODE_TYPE: &str = "cache_node_type";
    pub const PARAMETER_GROUP_NAME: &str = "parameter_group_name";
    pub const NUM_NODE_GROUPS: &str = "num_node_groups";
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalReplicationGroupOp {
    Modify(ModifyGlobalReplicationGroupInput),
    IncreaseNodeGroups {
        from: i32,
        to: i32,
    },
    DecreaseNodeGroups {
        from: i32,
        to: i32,
        global_node_groups_to_retain: Vec<String>,
    },
}

impl PlannedOperation for GlobalReplicationGroupOp {
    fn name(&self) -> &'static str {
        match self {
            GlobalReplicationGroupOp::Modify(input) if input.engine_version.is_some() => {
                "updating engine version of"
            }
            GlobalReplicationGroupOp::Modify(input) if input.cache_node_type.is_some() => {
                "updating node type of"
            }
            GlobalReplicationGroupOp::Modify(input)
                if input.automatic_failover_enabled.is_some() =>
            {
                "updating automatic failover of"
            }
            GlobalReplicationGroupOp::Modify(_) => "updating description of",
            GlobalReplicationGroupOp::IncreaseNodeGroups { .. } => "increasing node groups of",
            GlobalReplicationGroupOp::DecreaseNodeGroups { .. } => "decreasing node groups of",
        }
    }
}

/// Plan the update of global replication group `id`
///
/// `current` supplies the global node group ids needed to shrink the group.
pub fn plan_global_replication_group<D: ResourceDiff + ?Sized>(
    id: &str,
    diff: &D,
    current: Option<&GlobalReplicationGroup>,
) -> Result<Vec<GlobalReplicationGroupOp>> {
    let mut ops = Vec::new();

    if !diff.is_new_resource() {
        if let Some(change) = diff.change(fields::DESCRIPTION) {
            let mut input = ModifyGlobalReplicationGroupInput::new(id);
            input.description = Some(change.new_as::<String>()?.unwrap_or_default());
            ops.push(GlobalReplicationGroupOp::Modify(input));
        }
    }

    if let Some(change) = diff.change(fields::AUTOMATIC_FAILOVER_ENABLED) {
        let mut input = ModifyGlobalReplicationGroupInput::new(id);
        input.automatic_failover_enabled = Some(change.new_as::<bool>()?.unwrap_or(false));
        ops.push(GlobalReplicationGroupOp::Modify(input));
    }

    if let Some(change) = diff.change(fields::CACHE_NODE_TYPE) {
        if let Some(node_type) = change.new_as::<String>()? {
            let mut input = ModifyGlobalReplicationGroupInput::new(id);
            input.cache_node_type = Some(node_type);
            ops.push(GlobalReplicationGroupOp::Modify(input));
        }
    }

    if let Some(change) = diff.change(ENGINE_VERSION_FIELD) {
        if let Some(version) = change.new_as::<String>()? {
            let mut input = ModifyGlobalReplicationGroupInput::new(id);
            input.engine_version = Some(version);
            if diff.change(fields::PARAMETER_GROUP_NAME).is_some() {
                input.cache_parameter_group_name = diff.new_value(fields::PARAMETER_GROUP_NAME)?;
            }
            ops.push(GlobalReplicationGroupOp::Modify(input));
        }
    }

    if let Some(change) = diff.change(fields::NUM_NODE_GROUPS) {
        let from = change.old_as::<i32>()?.unwrap_or(0);
        let to = change.new_as::<i32>()?.unwrap_or(0);

        if to > from {
            ops.push(GlobalReplicationGroupOp::IncreaseNodeGroups { from, to });
        } else if to < from {
            let mut ids: Vec<String> = current
                .map(|g| {
                    g.global_node_groups
                        .iter()
                        .map(|ng| ng.global_node_group_id.clone())
                        .collect()
                })
                .unwrap_or_default();
            if ids.len() < to.max(0) as usize {
                return Err(CoreError::Validation(format!(
                    "cannot reduce {id} to {to} node groups: only {} global node groups are known",
                    ids.len()
                )));
            }
            ids.sort();
            ids.truncate(to.max(0) as usize);
            ops.push(GlobalReplicationGroupOp::DecreaseNodeGroups {
                from,
                to,
                global_node_groups_to_retain: ids,
            });
        }
    }

    Ok(ops)
}
