//! Replication group snapshots and inputs

use super::{Endpoint, LogDeliveryConfiguration, LogDeliveryConfigurationRequest, Tags};
use serde::{Deserialize, Serialize};

/// A member cache cluster of a node group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeGroupMember {
    pub cache_cluster_id: String,
    pub cache_node_id: Option<String>,
    /// "primary" or "replica"
    pub current_role: Option<String>,
    pub read_endpoint: Option<Endpoint>,
    pub preferred_availability_zone: Option<String>,
}

/// A shard of a replication group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    /// Zero-padded numeric id, e.g. "0001"
    pub node_group_id: String,
    pub status: Option<String>,
    pub primary_endpoint: Option<Endpoint>,
    pub reader_endpoint: Option<Endpoint>,
    #[serde(default)]
    pub node_group_members: Vec<NodeGroupMember>,
}

/// Describe-call view of a replication group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicationGroup {
    pub replication_group_id: String,
    pub arn: Option<String>,
    pub description: Option<String>,
    pub status: String,
    #[serde(default)]
    pub member_clusters: Vec<String>,
    #[serde(default)]
    pub node_groups: Vec<NodeGroup>,
    pub configuration_endpoint: Option<Endpoint>,
    pub cluster_enabled: Option<bool>,
    pub cluster_mode: Option<String>,
    /// "enabled", "enabling", "disabled" or "disabling"
    pub automatic_failover: Option<String>,
    /// "enabled" or "disabled"
    pub multi_az: Option<String>,
    pub global_replication_group_id: Option<String>,
    pub global_replication_group_member_role: Option<String>,
    pub kms_key_id: Option<String>,
    pub cache_node_type: Option<String>,
    pub snapshot_window: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    #[serde(default)]
    pub log_delivery_configurations: Vec<LogDeliveryConfiguration>,
    #[serde(default)]
    pub user_group_ids: Vec<String>,
    /// "enabled" or "disabled"
    pub data_tiering: Option<String>,
    pub ip_discovery: Option<String>,
    pub network_type: Option<String>,
    pub transit_encryption_enabled: Option<bool>,
    pub transit_encryption_mode: Option<String>,
    pub at_rest_encryption_enabled: Option<bool>,
    pub auth_token_enabled: Option<bool>,
}

/// Desired configuration for a new replication group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateReplicationGroupInput {
    pub replication_group_id: String,
    pub description: Option<String>,
    /// Joins an existing global replication group as a secondary
    pub global_replication_group_id: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub node_type: Option<String>,
    pub automatic_failover_enabled: bool,
    pub multi_az_enabled: bool,
    pub num_cache_clusters: Option<i32>,
    pub num_node_groups: Option<i32>,
    pub replicas_per_node_group: Option<i32>,
    pub cluster_mode: Option<String>,
    pub parameter_group_name: Option<String>,
    pub port: Option<i32>,
    pub subnet_group_name: Option<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub preferred_cache_cluster_azs: Vec<String>,
    #[serde(default)]
    pub snapshot_arns: Vec<String>,
    pub snapshot_name: Option<String>,
    pub snapshot_window: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    pub maintenance_window: Option<String>,
    pub notification_topic_arn: Option<String>,
    #[serde(default)]
    pub log_delivery_configurations: Vec<LogDeliveryConfiguration>,
    pub at_rest_encryption_enabled: Option<bool>,
    pub transit_encryption_enabled: Option<bool>,
    pub transit_encryption_mode: Option<String>,
    pub auth_token: Option<String>,
    pub kms_key_id: Option<String>,
    pub data_tiering_enabled: Option<bool>,
    pub ip_discovery: Option<String>,
    pub network_type: Option<String>,
    pub auto_minor_version_upgrade: Option<bool>,
    #[serde(default)]
    pub user_group_ids: Vec<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl CreateReplicationGroupInput {
    #[must_use]
    pub fn new(replication_group_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            replication_group_id: replication_group_id.into(),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    #[must_use]
    pub fn with_num_cache_clusters(mut self, count: i32) -> Self {
        self.num_cache_clusters = Some(count);
        self
    }

    #[must_use]
    pub fn with_sharding(mut self, num_node_groups: i32, replicas_per_node_group: i32) -> Self {
        self.num_node_groups = Some(num_node_groups);
        self.replicas_per_node_group = Some(replicas_per_node_group);
        self
    }

    #[must_use]
    pub fn with_automatic_failover(mut self, enabled: bool) -> Self {
        self.automatic_failover_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_multi_az(mut self, enabled: bool) -> Self {
        self.multi_az_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_global_replication_group(mut self, id: impl Into<String>) -> Self {
        self.global_replication_group_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// General modify request for a replication group; unset fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyReplicationGroupInput {
    pub replication_group_id: String,
    pub apply_immediately: bool,
    pub auto_minor_version_upgrade: Option<bool>,
    pub automatic_failover_enabled: Option<bool>,
    pub description: Option<String>,
    pub cluster_mode: Option<String>,
    pub engine_version: Option<String>,
    pub ip_discovery: Option<String>,
    pub network_type: Option<String>,
    #[serde(default)]
    pub log_delivery_configurations: Vec<LogDeliveryConfigurationRequest>,
    pub maintenance_window: Option<String>,
    pub multi_az_enabled: Option<bool>,
    pub cache_node_type: Option<String>,
    pub notification_topic_arn: Option<String>,
    pub cache_parameter_group_name: Option<String>,
    pub security_group_ids: Option<Vec<String>>,
    pub snapshotting_cluster_id: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    pub snapshot_window: Option<String>,
    pub transit_encryption_enabled: Option<bool>,
    pub transit_encryption_mode: Option<String>,
    #[serde(default)]
    pub user_group_ids_to_add: Vec<String>,
    #[serde(default)]
    pub user_group_ids_to_remove: Vec<String>,
    pub auth_token: Option<String>,
    /// "set", "rotate" or "delete"
    pub auth_token_update_strategy: Option<String>,
}

impl ModifyReplicationGroupInput {
    #[must_use]
    pub fn new(replication_group_id: impl Into<String>, apply_immediately: bool) -> Self {
        Self {
            replication_group_id: replication_group_id.into(),
            apply_immediately,
            ..Default::default()
        }
    }
}

/// Shard-count change; never combined with a replica-count change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyShardConfigurationInput {
    pub replication_group_id: String,
    pub apply_immediately: bool,
    pub node_group_count: i32,
    #[serde(default)]
    pub node_groups_to_remove: Vec<String>,
}

/// Input for the increase/decrease replica count calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaCountInput {
    pub replication_group_id: String,
    pub apply_immediately: bool,
    pub new_replica_count: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReplicationGroupInput {
    pub replication_group_id: String,
    pub final_snapshot_identifier: Option<String>,
}
