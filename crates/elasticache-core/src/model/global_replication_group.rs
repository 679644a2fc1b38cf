//! Global replication group snapshots and inputs

use serde::{Deserialize, Serialize};

/// A regional replication group participating in a global group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalReplicationGroupMember {
    pub replication_group_id: String,
    pub replication_group_region: Option<String>,
    /// "primary" or "secondary"
    pub role: Option<String>,
    /// "associated", "associating", "disassociated" or "disassociating"
    pub status: Option<String>,
    /// "enabled", "disabled", "enabling" or "disabling"
    pub automatic_failover: Option<String>,
}

/// A global shard, e.g. "virxk-0001"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalNodeGroup {
    pub global_node_group_id: String,
    pub slots: Option<String>,
}

/// Describe-call view of a global replication group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalReplicationGroup {
    pub global_replication_group_id: String,
    pub arn: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub cache_node_type: Option<String>,
    pub cluster_enabled: Option<bool>,
    #[serde(default)]
    pub members: Vec<GlobalReplicationGroupMember>,
    #[serde(default)]
    pub global_node_groups: Vec<GlobalNodeGroup>,
    pub at_rest_encryption_enabled: Option<bool>,
    pub transit_encryption_enabled: Option<bool>,
    pub auth_token_enabled: Option<bool>,
}

impl GlobalReplicationGroup {
    /// The member with the "primary" role, if any
    pub fn primary_member(&self) -> Option<&GlobalReplicationGroupMember> {
        self.members
            .iter()
            .find(|m| m.role.as_deref() == Some("primary"))
    }

    pub fn member(&self, replication_group_id: &str) -> Option<&GlobalReplicationGroupMember> {
        self.members
            .iter()
            .find(|m| m.replication_group_id == replication_group_id)
    }
}

/// Desired configuration for a new global replication group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateGlobalReplicationGroupInput {
    /// Suffix appended to the service-generated prefix
    pub global_replication_group_id_suffix: String,
    pub primary_replication_group_id: String,
    pub description: Option<String>,
    pub engine_version: Option<String>,
    pub cache_node_type: Option<String>,
    pub automatic_failover_enabled: Option<bool>,
    pub num_node_groups: Option<i32>,
    pub parameter_group_name: Option<String>,
}

impl CreateGlobalReplicationGroupInput {
    #[must_use]
    pub fn new(
        suffix: impl Into<String>,
        primary_replication_group_id: impl Into<String>,
    ) -> Self {
        Self {
            global_replication_group_id_suffix: suffix.into(),
            primary_replication_group_id: primary_replication_group_id.into(),
            ..Default::default()
        }
    }
}

/// Modify request for a global replication group
///
/// The remote API accepts a single property change per request; the planner
/// builds one of these per changed property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyGlobalReplicationGroupInput {
    pub global_replication_group_id: String,
    pub apply_immediately: bool,
    pub automatic_failover_enabled: Option<bool>,
    pub cache_node_type: Option<String>,
    pub engine_version: Option<String>,
    pub cache_parameter_group_name: Option<String>,
    pub description: Option<String>,
}

impl ModifyGlobalReplicationGroupInput {
    #[must_use]
    pub fn new(global_replication_group_id: impl Into<String>) -> Self {
        Self {
            global_replication_group_id: global_replication_group_id.into(),
            apply_immediately: true,
            ..Default::default()
        }
    }
}

/// Removes a regional replication group from its global group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisassociateGlobalReplicationGroupInput {
    pub global_replication_group_id: String,
    pub replication_group_id: String,
    pub replication_group_region: String,
}
