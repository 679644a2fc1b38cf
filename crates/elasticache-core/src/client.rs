//! Remote resource client interfaces
//!
//! The core never talks to the network itself. Callers supply implementations
//! of these traits (typically thin wrappers over an SDK client) that return
//! snapshots or already-classified [`ApiError`]s. Describe calls fail with
//! [`ApiError::NotFound`] when the resource is absent.
//!
//! Implementations must be safe to share across concurrent reconciles of
//! distinct resource identifiers.

use crate::error::ApiError;
use crate::model::{
    CacheCluster, CacheParameterGroup, CreateCacheClusterInput, CreateCacheParameterGroupInput,
    CreateGlobalReplicationGroupInput, CreateReplicationGroupInput, CreateUserGroupInput,
    DeleteReplicationGroupInput, DisassociateGlobalReplicationGroupInput, GlobalReplicationGroup,
    ModifyCacheClusterInput, ModifyGlobalReplicationGroupInput, ModifyReplicationGroupInput,
    ModifyShardConfigurationInput, ModifyUserGroupInput, Parameter, ReplicaCountInput,
    ReplicationGroup, Tags, UserGroup,
};
use async_trait::async_trait;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[async_trait]
pub trait CacheClusterApi: Send + Sync {
    async fn create_cache_cluster(&self, input: &CreateCacheClusterInput)
    -> ApiResult<CacheCluster>;

    /// Describe one cluster, including per-node information
    async fn describe_cache_cluster(&self, cache_cluster_id: &str) -> ApiResult<CacheCluster>;

    /// Describe the given clusters; ids that do not exist are omitted
    async fn describe_cache_clusters(&self, cache_cluster_ids: &[String])
    -> ApiResult<Vec<CacheCluster>>;

    async fn modify_cache_cluster(&self, input: &ModifyCacheClusterInput) -> ApiResult<()>;

    async fn delete_cache_cluster(
        &self,
        cache_cluster_id: &str,
        final_snapshot_identifier: Option<&str>,
    ) -> ApiResult<()>;
}

#[async_trait]
pub trait ReplicationGroupApi: Send + Sync {
    async fn create_replication_group(
        &self,
        input: &CreateReplicationGroupInput,
    ) -> ApiResult<ReplicationGroup>;

    async fn describe_replication_group(
        &self,
        replication_group_id: &str,
    ) -> ApiResult<ReplicationGroup>;

    async fn modify_replication_group(&self, input: &ModifyReplicationGroupInput)
    -> ApiResult<()>;

    async fn modify_replication_group_shard_configuration(
        &self,
        input: &ModifyShardConfigurationInput,
    ) -> ApiResult<()>;

    async fn increase_replica_count(&self, input: &ReplicaCountInput) -> ApiResult<()>;

    async fn decrease_replica_count(&self, input: &ReplicaCountInput) -> ApiResult<()>;

    async fn delete_replication_group(&self, input: &DeleteReplicationGroupInput)
    -> ApiResult<()>;
}

#[async_trait]
pub trait GlobalReplicationGroupApi: Send + Sync {
    async fn create_global_replication_group(
        &self,
        input: &CreateGlobalReplicationGroupInput,
    ) -> ApiResult<GlobalReplicationGroup>;

    async fn describe_global_replication_group(
        &self,
        global_replication_group_id: &str,
    ) -> ApiResult<GlobalReplicationGroup>;

    async fn modify_global_replication_group(
        &self,
        input: &ModifyGlobalReplicationGroupInput,
    ) -> ApiResult<()>;

    async fn increase_node_groups_in_global_replication_group(
        &self,
        global_replication_group_id: &str,
        node_group_count: i32,
    ) -> ApiResult<()>;

    /// Shrink to `node_group_count`, keeping the listed global node groups
    async fn decrease_node_groups_in_global_replication_group(
        &self,
        global_replication_group_id: &str,
        node_group_count: i32,
        global_node_groups_to_retain: &[String],
    ) -> ApiResult<()>;

    async fn disassociate_global_replication_group(
        &self,
        input: &DisassociateGlobalReplicationGroupInput,
    ) -> ApiResult<()>;

    async fn delete_global_replication_group(
        &self,
        global_replication_group_id: &str,
        retain_primary_replication_group: bool,
    ) -> ApiResult<()>;
}

#[async_trait]
pub trait ParameterGroupApi: Send + Sync {
    async fn create_cache_parameter_group(
        &self,
        input: &CreateCacheParameterGroupInput,
    ) -> ApiResult<CacheParameterGroup>;

    async fn describe_cache_parameter_group(&self, name: &str) -> ApiResult<CacheParameterGroup>;

    /// Parameters of a group, optionally filtered by source (e.g. "user")
    async fn describe_cache_parameters(
        &self,
        name: &str,
        source: Option<&str>,
    ) -> ApiResult<Vec<Parameter>>;

    async fn modify_cache_parameter_group(
        &self,
        name: &str,
        parameters: &[Parameter],
    ) -> ApiResult<()>;

    async fn reset_cache_parameter_group(
        &self,
        name: &str,
        parameter_names: &[String],
    ) -> ApiResult<()>;

    async fn delete_cache_parameter_group(&self, name: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait UserGroupApi: Send + Sync {
    async fn create_user_group(&self, input: &CreateUserGroupInput) -> ApiResult<UserGroup>;

    async fn describe_user_group(&self, user_group_id: &str) -> ApiResult<UserGroup>;

    async fn modify_user_group(&self, input: &ModifyUserGroupInput) -> ApiResult<()>;

    async fn delete_user_group(&self, user_group_id: &str) -> ApiResult<()>;
}

/// Tagging by resource ARN
#[async_trait]
pub trait TagApi: Send + Sync {
    async fn list_tags(&self, arn: &str) -> ApiResult<Tags>;

    async fn add_tags(&self, arn: &str, tags: &Tags) -> ApiResult<()>;

    async fn remove_tags(&self, arn: &str, keys: &[String]) -> ApiResult<()>;
}
