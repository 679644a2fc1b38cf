//! Cache cluster update planning
//!
//! All changed fields go into a single modify call. Node-count changes carry
//! either the node ids to remove or the zones for new nodes.

use super::{APPLY_IMMEDIATELY_FIELD, PlannedOperation, ids_to_remove, log_delivery_requests};
use crate::diff::{DiffExt, ResourceDiff};
use crate::error::{CoreError, Result};
use crate::model::{LogDeliveryConfiguration, ModifyCacheClusterInput};
use crate::version::ENGINE_VERSION_FIELD;
use tracing::info;

pub mod fields {
    pub const NUM_CACHE_NODES: &str = "num_cache_nodes";
    pub const PREFERRED_AVAILABILITY_ZONES: &str = "preferred_availability_zones";
    pub const AZ_MODE: &str = "az_mode";
    pub const SECURITY_GROUP_IDS: &str = "security_group_ids";
    pub const PARAMETER_GROUP_NAME: &str = "parameter_group_name";
    pub const IP_DISCOVERY: &str = "ip_discovery";
    pub const LOG_DELIVERY_CONFIGURATION: &str = "log_delivery_configuration";
    pub const MAINTENANCE_WINDOW: &str = "maintenance_window";
    pub const NOTIFICATION_TOPIC_ARN: &str = "notification_topic_arn";
    pub const AUTO_MINOR_VERSION_UPGRADE: &str = "auto_minor_version_upgrade";
    pub const SNAPSHOT_WINDOW: &str = "snapshot_window";
    pub const SNAPSHOT_RETENTION_LIMIT: &str = "snapshot_retention_limit";
    pub const NODE_TYPE: &str = "node_type";
    pub const TRANSIT_ENCRYPTION_ENABLED: &str = "transit_encryption_enabled";
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheClusterOp {
    Modify(Box<ModifyCacheClusterInput>),
}

impl PlannedOperation for CacheClusterOp {
    fn name(&self) -> &'static str {
        match self {
            CacheClusterOp::Modify(_) => "modifying",
        }
    }
}

/// Plan the update of cache cluster `id`
pub fn plan_cache_cluster<D: ResourceDiff + ?Sized>(
    id: &str,
    diff: &D,
) -> Result<Vec<CacheClusterOp>> {
    let apply_immediately = diff
        .new_value::<bool>(APPLY_IMMEDIATELY_FIELD)?
        .unwrap_or(false);
    let mut input = ModifyCacheClusterInput::new(id, apply_immediately);
    let mut request_update = false;

    if let Some(change) = diff.change(fields::SECURITY_GROUP_IDS) {
        let ids: Vec<String> = change.new_as()?.unwrap_or_default();
        if !ids.is_empty() {
            input.security_group_ids = Some(ids);
            request_update = true;
        }
    }

    if let Some(change) = diff.change(fields::PARAMETER_GROUP_NAME) {
        input.cache_parameter_group_name = change.new_as::<String>()?;
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

    if let Some(change) = diff.change(fields::NOTIFICATION_TOPIC_ARN) {
        input.notification_topic_arn = Some(change.new_as::<String>()?.unwrap_or_default());
        request_update = true;
    }

    if let Some(change) = diff.change(ENGINE_VERSION_FIELD) {
        input.engine_version = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::AUTO_MINOR_VERSION_UPGRADE) {
        if let Some(v) = change.new_as::<bool>()? {
            input.auto_minor_version_upgrade = Some(v);
            request_update = true;
        }
    }

    if let Some(change) = diff.change(fields::SNAPSHOT_WINDOW) {
        input.snapshot_window = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::NODE_TYPE) {
        input.cache_node_type = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::SNAPSHOT_RETENTION_LIMIT) {
        input.snapshot_retention_limit = Some(change.new_as::<i32>()?.unwrap_or(0));
        request_update = true;
    }

    if let Some(change) = diff.change(fields::AZ_MODE) {
        input.az_mode = change.new_as::<String>()?;
        request_update = true;
    }

    if let Some(change) = diff.change(fields::NUM_CACHE_NODES) {
        let old = change.old_as::<i32>()?.unwrap_or(0);
        let new = change.new_as::<i32>()?.unwrap_or(0);

        if new < old {
            info!(id = %id, from = old, to = new, "decreasing cache nodes");
            input.cache_node_ids_to_remove = ids_to_remove(old, new);
        } else {
            info!(id = %id, from = old, to = new, "increasing cache nodes");
            let zones: Vec<String> = diff
                .new_value(fields::PREFERRED_AVAILABILITY_ZONES)?
                .unwrap_or_default();
            if !zones.is_empty() {
                if zones.len() != new as usize {
                    return Err(CoreError::Validation(format!(
                        "length of preferred_availability_zones ({}) must match num_cache_nodes ({new})",
                        zones.len()
                    )));
                }
                input.new_availability_zones = zones[old.max(0) as usize..].to_vec();
            }
        }

        input.num_cache_nodes = Some(new);
        request_update = true;
    }

    if let Some(change) = diff.change(fields::TRANSIT_ENCRYPTION_ENABLED) {
        input.transit_encryption_enabled = Some(change.new_as::<bool>()?.unwrap_or(false));
        request_update = true;
    }

    if request_update {
        Ok(vec![CacheClusterOp::Modify(Box::new(input))])
    } else {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ConfigDiff;
    use pretty_assertions::assert_eq;

    fn single_modify(ops: Vec<CacheClusterOp>) -> ModifyCacheClusterInput {
        let mut ops = ops.into_iter();
        match (ops.next(), ops.next()) {
            (Some(CacheClusterOp::Modify(input)), None) => *input,
            other => panic!("expected a single modify, got {other:?}"),
        }
    }

    #[test]
    fn test_no_changes() {
        let diff = ConfigDiff::new().with_spurious_change(fields::NUM_CACHE_NODES, 3);
        assert_eq!(plan_cache_cluster("mc", &diff).unwrap(), vec![]);
    }

    #[test]
    fn test_node_decrease_removes_highest_ids() {
        let diff = ConfigDiff::new().with_change(fields::NUM_CACHE_NODES, 5, 2);
        let input = single_modify(plan_cache_cluster("mc", &diff).unwrap());
        assert_eq!(input.num_cache_nodes, Some(2));
        assert_eq!(input.cache_node_ids_to_remove, vec!["0005", "0004", "0003"]);
        assert!(input.new_availability_zones.is_empty());
    }

    #[test]
    fn test_node_increase_assigns_new_zones() {
        let diff = ConfigDiff::new()
            .with_change(fields::NUM_CACHE_NODES, 2, 4)
            .with_change(
                fields::PREFERRED_AVAILABILITY_ZONES,
                vec!["us-east-1a", "us-east-1b"],
                vec!["us-east-1a", "us-east-1b", "us-east-1c", "us-east-1a"],
            );
        let input = single_modify(plan_cache_cluster("mc", &diff).unwrap());
        assert_eq!(input.num_cache_nodes, Some(4));
        assert_eq!(input.new_availability_zones, vec!["us-east-1c", "us-east-1a"]);
        assert!(input.cache_node_ids_to_remove.is_empty());
    }

    #[test]
    fn test_node_increase_zone_count_mismatch() {
        let diff = ConfigDiff::new()
            .with_change(fields::NUM_CACHE_NODES, 2, 4)
            .with_unchanged(fields::PREFERRED_AVAILABILITY_ZONES, vec!["us-east-1a", "us-east-1b"]);
        let err = plan_cache_cluster("mc", &diff).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("must match num_cache_nodes (4)"));
    }

    #[test]
    fn test_fields_batch_into_one_call() {
        let diff = ConfigDiff::new()
            .with_change(APPLY_IMMEDIATELY_FIELD, false, true)
            .with_change(fields::NODE_TYPE, "cache.t3.micro", "cache.t3.small")
            .with_change(ENGINE_VERSION_FIELD, "1.6.6", "1.6.12")
            .with_change(fields::AZ_MODE, "single-az", "cross-az");
        let input = single_modify(plan_cache_cluster("mc", &diff).unwrap());
        assert!(input.apply_immediately);
        assert_eq!(input.cache_node_type.as_deref(), Some("cache.t3.small"));
        assert_eq!(input.engine_version.as_deref(), Some("1.6.12"));
        assert_eq!(input.az_mode.as_deref(), Some("cross-az"));
        assert_eq!(input.num_cache_nodes, None);
    }
}
