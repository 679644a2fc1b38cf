//! Replication group update planning
//!
//! Order of operations:
//!
//! 1. node-group count, then replicas per node group (sharded groups), or an
//!    increase of `num_cache_clusters` (non-sharded groups)
//! 2. one general modify call carrying every other changed field
//! 3. auth token rotation as its own request
//! 4. a decrease of `num_cache_clusters`
//!
//! Tags are reconciled by the orchestrator after all of these.

use super::{APPLY_IMMEDIATELY_FIELD, PlannedOperation, ids_to_remove, log_delivery_requests};
use crate::diff::{DiffExt, ResourceDiff, string_set_delta};
use crate::error::Result;
use crate::model::{LogDeliveryConfiguration, ModifyReplicationGroupInput};
use crate::version::ENGINE_VERSION_FIELD;

pub mod fields {
    pub const NUM_NODE_GROUPS: &str = "num_node_groups";
    pub const REPLICAS_PER_NODE_GROUP: &str = "replicas_per_node_group";
    pub const NUM_CACHE_CLUSTERS: &str = "num_cache_clusters";
    pub const AUTO_MINOR_VERSION_UPGRADE: &str = "auto_minor_version_upgrade";
    pub const AUTOMATIC_FAILOVER_ENABLED: &str = "automatic_failover_enabled";
    pub const DESCRIPTION: &str = "description";
    pub const CLUSTER_MODE: &str = "cluster_mode";
    pub const IP_DISCOVERY: &str = "ip_discovery";
    pub const LOG_DELIVERY_CONFIGURATION: &str = "log_delivery_configuration";
    pub const MAINTENANCE_WINDOW: &str = "maintenance_window";
    pub const MULTI_AZ_ENABLED: &str = "multi_az_enabled";
    pub const NETWORK_TYPE: &str = "network_type";
    pub const NODE_TYPE: &str = "node_type";
    pub const NOTIFICATION_TOPIC_ARN: &str = "notification_topic_arn";
    pub const PARAMETER_GROUP_NAME: &str = "parameter_group_name";
    pub const SECURITY_GROUP_IDS: &str = "security_group_ids";
    pub const SNAPSHOT_RETENTION_LIMIT: &str = "snapshot_retention_limit";
    pub const SNAPSHOT_WINDOW: &str = "snapshot_window";
    pub const TRANSIT_ENCRYPTION_ENABLED: &str = "transit_encryption_enabled";
    pub const TRANSIT_ENCRYPTION_MODE: &str = "transit_encryption_mode";
    pub const USER_GROUP_IDS: &str = "user_group_ids";
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const AUTH_TOKEN_UPDATE_STRATEGY: &str = "auth_token_update_strategy";
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationGroupOp {
    /// Change the number of node groups; ids are removed highest first
    ModifyNodeGroupCount {
        from: i32,
        to: i32,
        node_groups_to_remove: Vec<String>,
    },
    /// Increase replicas in every node group of a sharded group
    IncreaseReplicasPerNodeGroup { from: i32, to: i32 },
    /// Decrease replicas in every node group of a sharded group
    DecreaseReplicasPerNodeGroup { from: i32, to: i32 },
    /// Add cache clusters to a non-sharded group
    IncreaseCacheClusters { from: i32, to: i32 },
    /// General modify call batching all remaining fields
    Modify(Box<ModifyReplicationGroupInput>),
    /// Set, rotate or delete the auth token
    UpdateAuthToken {
        auth_token: Option<String>,
        strategy: Option<String>,
    },
    /// Remove cache clusters from a non-sharded group
    DecreaseCacheClusters { from: i32, to: i32 },
}

impl ReplicationGroupOp {
    /// Replica count submitted to the increase/decrease replica calls
    ///
    /// For a non-sharded group the count excludes the primary.
    pub fn new_replica_count(&self) -> Option<i32> {
        match self {
            ReplicationGroupOp::IncreaseReplicasPerNodeGroup { to, .. }
            | ReplicationGroupOp::DecreaseReplicasPerNodeGroup { to, .. } => Some(*to),
            ReplicationGroupOp::IncreaseCacheClusters { to, .. }
            | ReplicationGroupOp::DecreaseCacheClusters { to, .. } => Some(to - 1),
            _ => None,
        }
    }
}

impl PlannedOperation for ReplicationGroupOp {
    fn name(&self) -> &'static str {
        match self {
            ReplicationGroupOp::ModifyNodeGroupCount { .. } => "modifying shard configuration of",
            ReplicationGroupOp::IncreaseReplicasPerNodeGroup { .. }
            | ReplicationGroupOp::IncreaseCacheClusters { .. } => "increasing replica count of",
            ReplicationGroupOp::DecreaseReplicasPerNodeGroup { .. }
            | ReplicationGroupOp::DecreaseCacheClusters { .. } => "decreasing replica count of",
            ReplicationGroupOp::Modify(_) => "modifying",
            ReplicationGroupOp::UpdateAuthToken { .. } => "modifying authentication of",
        }
    }
}

/// Plan the update of replication group `id`
pub fn plan_replication_group<D: ResourceDiff + ?Sized>(
    id: &str,
    diff: &D,
) -> Result<Vec<ReplicationGroupOp>> {
    let mut ops = Vec::new();

    let node_groups = diff.change(fields::NUM_NODE_GROUPS);
    let replicas = diff.change(fields::REPLICAS_PER_NODE_GROUP);
    let cache_clusters = counts(diff, fields::NUM_CACHE_CLUSTERS)?;

    if node_groups.is_some() || replicas.is_some() {
        if node_groups.is_some() {
            if let Some((from, to)) = counts(diff, fields::NUM_NODE_GROUPS)? {
                ops.push(ReplicationGroupOp::ModifyNodeGroupCount {
                    from,
                    to,
                    node_groups_to_remove: ids_to_remove(from, to),
                });
            }
        }
        if let Some((from, to)) = counts(diff, fields::REPLICAS_PER_NODE_GROUP)? {
            if to > from {
                ops.push(ReplicationGroupOp::IncreaseReplicasPerNodeGroup { from, to });
            } else if to < from {
                ops.push(ReplicationGroupOp::DecreaseReplicasPerNodeGroup { from, to });
            }
        }
    } else if let Some((from, to)) = cache_clusters {
        if to > from {
            ops.push(ReplicationGroupOp::IncreaseCacheClusters { from, to });
        }
    }

    if let Some(input) = general_modify(id, diff)? {
        ops.push(ReplicationGroupOp::Modify(Box::new(input)));
    }

    if diff.has_any_change(&[fields::AUTH_TOKEN, fields::AUTH_TOKEN_UPDATE_STRATEGY]) {
        ops.push(ReplicationGroupOp::UpdateAuthToken {
            auth_token: diff.new_value(fields::AUTH_TOKEN)?,
            strategy: diff.new_value(fields::AUTH_TOKEN_UPDATE_STRATEGY)?,
        });
    }

    if let Some((from, to)) = cache_clusters {
        if to < from {
            ops.push(ReplicationGroupOp::DecreaseCacheClusters { from, to });
        }
    }

    Ok(ops)
}

/// Old and new counts for a changed integer field; unset reads as zero
fn counts<D: ResourceDiff + ?Sized>(diff: &D, field: &str) -> Result<Option<(i32, i32)>> {
    match diff.change(field) {
        Some(change) => Ok(Some((
            change.old_as::<i32>()?.unwrap_or(0),
            change.new_as::<i32>()?.unwrap_or(0),
        ))),
        None => Ok(None),
    }
}

fn general_modify<D: ResourceDiff + ?Sized>(
    id: &str,
    diff: &D,
) -> Result<Option<ModifyReplicationGroupInput>> {
    let apply_immediately = diff
        .new_value::<bool>(APPLY_IMMEDIATELY_FIELD)?
        .unwrap_or(false);
    let mut input = ModifyReplicationGroupInput::new(id, apply_immediately);
    let mut request_update = false;

    if let Some(change) = diff.change(fields::AUTO_MINOR_VERSION_UPGRADE) {
        if let Some(v) = change.new_as::<bool>()? {
            input.auto_minor_version_upgrade = Some(v);
            request_update = true;
        }
    }

    if let Some(change) = diff.change(fields::AUTOMATIC_FAILOVER_ENABLED) {
        input.automatic_failover_enabled = Some(change.new_as::<bool>()?.unwrap_or(false));
        request_update = true;
    }

    if let Some(change) = diff.change(fields::DESCRIPTION) {
        input.description = Some(change.new_as::<String>()?.unwrap_or_default());
        request_update = true;
    }

    if let Some(change) = diff.change(fields::CLUSTER_MODE) {
        input.cluster_mode = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(ENGINE_VERSION_FIELD) {
        input.engine_version = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::IP_DISCOVERY) {
        input.ip_discovery = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::LOG_DELIVERY_CONFIGURATION) {
        let old: Vec<LogDeliveryConfiguration> = change.old_as()?.unwrap_or_default();
        let new: Vec<LogDeliveryConfiguration> = change.new_as()?.unwrap_or_default();
        input.log_delivery_configurations = log_delivery_requests(&old, &new);
        request_update = true;
    }

    if let Some(change) = diff.change(fields::MAINTENANCE_WINDOW) {
        input.maintenance_window = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::MULTI_AZ_ENABLED) {
        input.multi_az_enabled = Some(change.new_as::<bool>()?.unwrap_or(false));
        request_update = true;
    }

    if let Some(change) = diff.change(fields::NETWORK_TYPE) {
        input.network_type = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::NODE_TYPE) {
        input.cache_node_type = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::NOTIFICATION_TOPIC_ARN) {
        input.notification_topic_arn = Some(change.new_as::<String>()?.unwrap_or_default());
        request_update = true;
    }

    if let Some(change) = diff.change(fields::PARAMETER_GROUP_NAME) {
        input.cache_parameter_group_name = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::SECURITY_GROUP_IDS) {
        let ids: Vec<String> = change.new_as()?.unwrap_or_default();
        if !ids.is_empty() {
            input.security_group_ids = Some(ids);
            request_update = true;
        }
    }

    if let Some(change) = diff.change(fields::SNAPSHOT_RETENTION_LIMIT) {
        // enabling snapshots needs a member cluster to take them
        if change.old_as::<i32>()?.unwrap_or(0) == 0 {
            input.snapshotting_cluster_id = Some(format!("{id}-001"));
        }
        input.snapshot_retention_limit = Some(change.new_as::<i32>()?.unwrap_or(0));
        request_update = true;
    }

    if let Some(change) = diff.change(fields::SNAPSHOT_WINDOW) {
        input.snapshot_window = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::TRANSIT_ENCRYPTION_ENABLED) {
        input.transit_encryption_enabled = Some(change.new_as::<bool>()?.unwrap_or(false));
        request_update = true;
    }

    if let Some(change) = diff.change(fields::TRANSIT_ENCRYPTION_MODE) {
        input.transit_encryption_mode = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::USER_GROUP_IDS) {
        let old: Vec<String> = change.old_as()?.unwrap_or_default();
        let new: Vec<String> = change.new_as()?.unwrap_or_default();
        let (add, remove) = string_set_delta(&old, &new);
        if !add.is_empty() {
            input.user_group_ids_to_add = add;
            request_update = true;
        }
        if !remove.is_empty() {
            input.user_group_ids_to_remove = remove;
            request_update = true;
        }
    }

    Ok(request_update.then_some(input))
}
