//! Cache cluster snapshots and inputs

use super::{Endpoint, LogDeliveryConfiguration, LogDeliveryConfigurationRequest, Tags};
use serde::{Deserialize, Serialize};

/// A single cache node within a cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheNode {
    /// Four-digit zero-padded node id, e.g. "0001"
    pub cache_node_id: String,
    pub status: Option<String>,
    pub endpoint: Option<Endpoint>,
    pub availability_zone: Option<String>,
}

/// Describe-call view of a cache cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheCluster {
    pub cache_cluster_id: String,
    pub arn: Option<String>,
    pub status: String,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub cache_node_type: Option<String>,
    pub num_cache_nodes: i32,
    #[serde(default)]
    pub cache_nodes: Vec<CacheNode>,
    pub configuration_endpoint: Option<Endpoint>,
    /// Availability zone, or "Multiple" for cross-AZ clusters
    pub preferred_availability_zone: Option<String>,
    pub replication_group_id: Option<String>,
    pub cache_parameter_group_name: Option<String>,
    pub cache_subnet_group_name: Option<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    pub maintenance_window: Option<String>,
    pub snapshot_window: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    pub notification_topic_arn: Option<String>,
    #[serde(default)]
    pub log_delivery_configurations: Vec<LogDeliveryConfiguration>,
    pub ip_discovery: Option<String>,
    pub network_type: Option<String>,
    pub transit_encryption_enabled: Option<bool>,
    pub transit_encryption_mode: Option<String>,
    pub at_rest_encryption_enabled: Option<bool>,
    pub auth_token_enabled: Option<bool>,
    pub auto_minor_version_upgrade: Option<bool>,
}

/// Desired configuration for a new cache cluster
///
/// Exactly one of `engine` or `replication_group_id` must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCacheClusterInput {
    pub cache_cluster_id: String,
    pub replication_group_id: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub node_type: Option<String>,
    pub num_cache_nodes: Option<i32>,
    /// "single-az" or "cross-az"
    pub az_mode: Option<String>,
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub preferred_availability_zones: Vec<String>,
    pub parameter_group_name: Option<String>,
    pub port: Option<i32>,
    pub subnet_group_name: Option<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub snapshot_arns: Vec<String>,
    pub snapshot_name: Option<String>,
    pub snapshot_window: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    pub maintenance_window: Option<String>,
    pub notification_topic_arn: Option<String>,
    #[serde(default)]
    pub log_delivery_configurations: Vec<LogDeliveryConfiguration>,
    pub ip_discovery: Option<String>,
    pub network_type: Option<String>,
    pub transit_encryption_enabled: Option<bool>,
    pub auto_minor_version_upgrade: Option<bool>,
    #[serde(default)]
    pub tags: Tags,
}

impl CreateCacheClusterInput {
    /// Create a standalone cluster input for the given engine
    #[must_use]
    pub fn new(cache_cluster_id: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            cache_cluster_id: cache_cluster_id.into(),
            engine: Some(engine.into()),
            ..Default::default()
        }
    }

    /// Create a cluster input that joins an existing replication group
    #[must_use]
    pub fn in_replication_group(
        cache_cluster_id: impl Into<String>,
        replication_group_id: impl Into<String>,
    ) -> Self {
        Self {
            cache_cluster_id: cache_cluster_id.into(),
            replication_group_id: Some(replication_group_id.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    #[must_use]
    pub fn with_num_cache_nodes(mut self, count: i32) -> Self {
        self.num_cache_nodes = Some(count);
        self
    }

    #[must_use]
    pub fn with_engine_version(mut self, version: impl Into<String>) -> Self {
        self.engine_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// Modify request for a cache cluster; unset fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyCacheClusterInput {
    pub cache_cluster_id: String,
    pub apply_immediately: bool,
    pub num_cache_nodes: Option<i32>,
    #[serde(default)]
    pub cache_node_ids_to_remove: Vec<String>,
    #[serde(default)]
    pub new_availability_zones: Vec<String>,
    pub az_mode: Option<String>,
    pub security_group_ids: Option<Vec<String>>,
    pub cache_parameter_group_name: Option<String>,
    pub maintenance_window: Option<String>,
    pub notification_topic_arn: Option<String>,
    pub engine_version: Option<String>,
    pub snapshot_window: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    pub cache_node_type: Option<String>,
    pub ip_discovery: Option<String>,
    #[serde(default)]
    pub log_delivery_configurations: Vec<LogDeliveryConfigurationRequest>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub transit_encryption_enabled: Option<bool>,
}

impl ModifyCacheClusterInput {
    #[must_use]
    pub fn new(cache_cluster_id: impl Into<String>, apply_immediately: bool) -> Self {
        Self {
            cache_cluster_id: cache_cluster_id.into(),
            apply_immediately,
            ..Default::default()
        }
    }
}
