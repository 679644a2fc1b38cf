//! Scripted in-memory ElastiCache client shared by the integration tests
//!
//! Describe calls replay a per-id script; the last entry repeats. Ids with no
//! script are not found. Every call is recorded, and failures can be queued
//! per operation name.

#![allow(dead_code)]

use async_trait::async_trait;
use elasticache_core::client::{
    ApiResult, CacheClusterApi, GlobalReplicationGroupApi, ParameterGroupApi, ReplicationGroupApi,
    TagApi, UserGroupApi,
};
use elasticache_core::config::ReconcilerConfig;
use elasticache_core::error::ApiError;
use elasticache_core::model::{
    CacheCluster, CacheParameterGroup, CreateCacheClusterInput, CreateCacheParameterGroupInput,
    CreateGlobalReplicationGroupInput, CreateReplicationGroupInput, CreateUserGroupInput,
    DeleteReplicationGroupInput, DisassociateGlobalReplicationGroupInput, GlobalReplicationGroup,
    GlobalReplicationGroupMember, ModifyCacheClusterInput, ModifyGlobalReplicationGroupInput,
    ModifyReplicationGroupInput, ModifyShardConfigurationInput, ModifyUserGroupInput, NodeGroup,
    NodeGroupMember, Parameter, ReplicaCountInput, ReplicationGroup, Tags, UserGroup,
};
use elasticache_core::workflows::ReconcileContext;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const ACCOUNT_ARN: &str = "arn:aws:elasticache:us-west-2:123456789012";

pub fn arn(kind: &str, id: &str) -> String {
    format!("{ACCOUNT_ARN}:{kind}:{id}")
}

fn not_found(kind: &str, id: &str) -> ApiError {
    ApiError::not_found(format!("{kind}NotFoundFault"), format!("{kind} {id} not found"))
}

/// Describe responses per id
struct Script<T> {
    responses: Mutex<HashMap<String, VecDeque<ApiResult<T>>>>,
}

impl<T: Clone> Default for Script<T> {
    fn default() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> Script<T> {
    fn push(&self, id: &str, response: ApiResult<T>) {
        self.responses
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(response);
    }

    fn next(&self, id: &str) -> Option<ApiResult<T>> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(id)?;
        if queue.len() > 1 {
            return queue.pop_front();
        }
        queue.front().cloned()
    }
}

#[derive(Default)]
pub struct FakeElastiCache {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, VecDeque<ApiError>>>,
    cache_clusters: Script<CacheCluster>,
    replication_groups: Script<ReplicationGroup>,
    global_groups: Script<GlobalReplicationGroup>,
    parameter_groups: Script<CacheParameterGroup>,
    user_groups: Script<UserGroup>,
    parameters: Mutex<HashMap<String, Vec<Parameter>>>,
    tags: Mutex<HashMap<String, Tags>>,
}

impl FakeElastiCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue describe responses for a cache cluster, one per status
    pub fn script_cache_cluster(&self, cluster: &CacheCluster, statuses: &[&str]) {
        for status in statuses {
            let mut snapshot = cluster.clone();
            snapshot.status = status.to_string();
            self.cache_clusters.push(&cluster.cache_cluster_id, Ok(snapshot));
        }
    }

    pub fn script_cache_cluster_missing(&self, id: &str) {
        self.cache_clusters.push(id, Err(not_found("CacheCluster", id)));
    }

    pub fn script_replication_group(&self, group: &ReplicationGroup, statuses: &[&str]) {
        for status in statuses {
            let mut snapshot = group.clone();
            snapshot.status = status.to_string();
            self.replication_groups
                .push(&group.replication_group_id, Ok(snapshot));
        }
    }

    pub fn script_replication_group_missing(&self, id: &str) {
        self.replication_groups
            .push(id, Err(not_found("ReplicationGroup", id)));
    }

    pub fn script_global_replication_group(&self, group: &GlobalReplicationGroup) {
        self.global_groups
            .push(&group.global_replication_group_id, Ok(group.clone()));
    }

    pub fn script_global_replication_group_missing(&self, id: &str) {
        self.global_groups
            .push(id, Err(not_found("GlobalReplicationGroup", id)));
    }

    pub fn script_parameter_group(&self, group: &CacheParameterGroup) {
        self.parameter_groups.push(&group.name, Ok(group.clone()));
    }

    pub fn script_user_group(&self, group: &UserGroup, statuses: &[&str]) {
        for status in statuses {
            let mut snapshot = group.clone();
            snapshot.status = status.to_string();
            self.user_groups.push(&group.user_group_id, Ok(snapshot));
        }
    }

    pub fn script_user_group_missing(&self, id: &str) {
        self.user_groups.push(id, Err(not_found("UserGroup", id)));
    }

    pub fn set_parameters(&self, group: &str, parameters: Vec<Parameter>) {
        self.parameters
            .lock()
            .unwrap()
            .insert(group.to_string(), parameters);
    }

    pub fn set_tags(&self, arn: &str, tags: Tags) {
        self.tags.lock().unwrap().insert(arn.to_string(), tags);
    }

    pub fn tags_of(&self, arn: &str) -> Tags {
        self.tags.lock().unwrap().get(arn).cloned().unwrap_or_default()
    }

    /// Fail the next call to `operation` with `error`
    pub fn fail_next(&self, operation: &'static str, error: ApiError) {
        self.failures
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls, excluding describes and tag listing
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("describe") && !c.starts_with("list_tags"))
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    fn record(&self, operation: &'static str, detail: impl AsRef<str>) -> ApiResult<()> {
        let detail = detail.as_ref();
        let entry = if detail.is_empty() {
            operation.to_string()
        } else {
            format!("{operation} {detail}")
        };
        self.calls.lock().unwrap().push(entry);

        match self
            .failures
            .lock()
            .unwrap()
            .get_mut(operation)
            .and_then(|q| q.pop_front())
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CacheClusterApi for FakeElastiCache {
    async fn create_cache_cluster(&self, input: &CreateCacheClusterInput) -> ApiResult<CacheCluster> {
        let id = &input.cache_cluster_id;
        self.record("create_cache_cluster", format!("{id} tags={}", input.tags.len()))?;
        Ok(CacheCluster {
            cache_cluster_id: id.clone(),
            arn: Some(arn("cluster", id)),
            status: "creating".to_string(),
            engine: input.engine.clone(),
            ..Default::default()
        })
    }

    async fn describe_cache_cluster(&self, cache_cluster_id: &str) -> ApiResult<CacheCluster> {
        self.record("describe_cache_cluster", cache_cluster_id)?;
        self.cache_clusters
            .next(cache_cluster_id)
            .unwrap_or_else(|| Err(not_found("CacheCluster", cache_cluster_id)))
    }

    async fn describe_cache_clusters(&self, cache_cluster_ids: &[String]) -> ApiResult<Vec<CacheCluster>> {
        self.record("describe_cache_clusters", cache_cluster_ids.join(","))?;
        Ok(cache_cluster_ids
            .iter()
            .filter_map(|id| self.cache_clusters.next(id))
            .filter_map(|r| r.ok())
            .collect())
    }

    async fn modify_cache_cluster(&self, input: &ModifyCacheClusterInput) -> ApiResult<()> {
        self.record("modify_cache_cluster", &input.cache_cluster_id)
    }

    async fn delete_cache_cluster(
        &self,
        cache_cluster_id: &str,
        final_snapshot_identifier: Option<&str>,
    ) -> ApiResult<()> {
        self.record(
            "delete_cache_cluster",
            format!("{cache_cluster_id} snapshot={}", final_snapshot_identifier.unwrap_or("-")),
        )
    }
}

#[async_trait]
impl ReplicationGroupApi for FakeElastiCache {
    async fn create_replication_group(
        &self,
        input: &CreateReplicationGroupInput,
    ) -> ApiResult<ReplicationGroup> {
        let id = &input.replication_group_id;
        self.record(
            "create_replication_group",
            format!(
                "{id} tags={} node_type={}",
                input.tags.len(),
                input.node_type.as_deref().unwrap_or("-")
            ),
        )?;
        Ok(ReplicationGroup {
            replication_group_id: id.clone(),
            arn: Some(arn("replicationgroup", id)),
            status: "creating".to_string(),
            ..Default::default()
        })
    }

    async fn describe_replication_group(&self, replication_group_id: &str) -> ApiResult<ReplicationGroup> {
        self.record("describe_replication_group", replication_group_id)?;
        self.replication_groups
            .next(replication_group_id)
            .unwrap_or_else(|| Err(not_found("ReplicationGroup", replication_group_id)))
    }

    async fn modify_replication_group(&self, input: &ModifyReplicationGroupInput) -> ApiResult<()> {
        let mut detail = input.replication_group_id.clone();
        if input.auth_token.is_some() || input.auth_token_update_strategy.is_some() {
            detail.push_str(" auth_token");
        }
        self.record("modify_replication_group", detail)
    }

    async fn modify_replication_group_shard_configuration(
        &self,
        input: &ModifyShardConfigurationInput,
    ) -> ApiResult<()> {
        self.record(
            "modify_replication_group_shard_configuration",
            format!(
                "{} {} remove={}",
                input.replication_group_id,
                input.node_group_count,
                input.node_groups_to_remove.join(",")
            ),
        )
    }

    async fn increase_replica_count(&self, input: &ReplicaCountInput) -> ApiResult<()> {
        self.record(
            "increase_replica_count",
            format!("{} {}", input.replication_group_id, input.new_replica_count),
        )
    }

    async fn decrease_replica_count(&self, input: &ReplicaCountInput) -> ApiResult<()> {
        self.record(
            "decrease_replica_count",
            format!("{} {}", input.replication_group_id, input.new_replica_count),
        )
    }

    async fn delete_replication_group(&self, input: &DeleteReplicationGroupInput) -> ApiResult<()> {
        self.record("delete_replication_group", &input.replication_group_id)
    }
}

#[async_trait]
impl GlobalReplicationGroupApi for FakeElastiCache {
    async fn create_global_replication_group(
        &self,
        input: &CreateGlobalReplicationGroupInput,
    ) -> ApiResult<GlobalReplicationGroup> {
        let id = format!("ldgnf-{}", input.global_replication_group_id_suffix);
        self.record("create_global_replication_group", &id)?;
        Ok(GlobalReplicationGroup {
            global_replication_group_id: id,
            status: "creating".to_string(),
            ..Default::default()
        })
    }

    async fn describe_global_replication_group(
        &self,
        global_replication_group_id: &str,
    ) -> ApiResult<GlobalReplicationGroup> {
        self.record("describe_global_replication_group", global_replication_group_id)?;
        self.global_groups
            .next(global_replication_group_id)
            .unwrap_or_else(|| {
                Err(not_found("GlobalReplicationGroup", global_replication_group_id))
            })
    }

    async fn modify_global_replication_group(
        &self,
        input: &ModifyGlobalReplicationGroupInput,
    ) -> ApiResult<()> {
        let mut detail = input.global_replication_group_id.clone();
        if let Some(failover) = input.automatic_failover_enabled {
            detail.push_str(&format!(" failover={failover}"));
        }
        if let Some(version) = &input.engine_version {
            detail.push_str(&format!(" engine_version={version}"));
        }
        if let Some(node_type) = &input.cache_node_type {
            detail.push_str(&format!(" node_type={node_type}"));
        }
        self.record("modify_global_replication_group", detail)
    }

    async fn increase_node_groups_in_global_replication_group(
        &self,
        global_replication_group_id: &str,
        node_group_count: i32,
    ) -> ApiResult<()> {
        self.record(
            "increase_node_groups_in_global_replication_group",
            format!("{global_replication_group_id} {node_group_count}"),
        )
    }

    async fn decrease_node_groups_in_global_replication_group(
        &self,
        global_replication_group_id: &str,
        node_group_count: i32,
        global_node_groups_to_retain: &[String],
    ) -> ApiResult<()> {
        self.record(
            "decrease_node_groups_in_global_replication_group",
            format!(
                "{global_replication_group_id} {node_group_count} retain={}",
                global_node_groups_to_retain.join(",")
            ),
        )
    }

    async fn disassociate_global_replication_group(
        &self,
        input: &DisassociateGlobalReplicationGroupInput,
    ) -> ApiResult<()> {
        self.record(
            "disassociate_global_replication_group",
            format!(
                "{} {} {}",
                input.global_replication_group_id,
                input.replication_group_id,
                input.replication_group_region
            ),
        )
    }

    async fn delete_global_replication_group(
        &self,
        global_replication_group_id: &str,
        retain_primary_replication_group: bool,
    ) -> ApiResult<()> {
        self.record(
            "delete_global_replication_group",
            format!("{global_replication_group_id} retain={retain_primary_replication_group}"),
        )
    }
}

#[async_trait]
impl ParameterGroupApi for FakeElastiCache {
    async fn create_cache_parameter_group(
        &self,
        input: &CreateCacheParameterGroupInput,
    ) -> ApiResult<CacheParameterGroup> {
        self.record(
            "create_cache_parameter_group",
            format!("{} tags={}", input.name, input.tags.len()),
        )?;
        Ok(CacheParameterGroup {
            name: input.name.clone(),
            family: input.family.clone(),
            description: input.description.clone(),
            arn: Some(arn("parametergroup", &input.name)),
            is_global: false,
        })
    }

    async fn describe_cache_parameter_group(&self, name: &str) -> ApiResult<CacheParameterGroup> {
        self.record("describe_cache_parameter_group", name)?;
        self.parameter_groups
            .next(name)
            .unwrap_or_else(|| Err(not_found("CacheParameterGroup", name)))
    }

    async fn describe_cache_parameters(
        &self,
        name: &str,
        source: Option<&str>,
    ) -> ApiResult<Vec<Parameter>> {
        self.record(
            "describe_cache_parameters",
            format!("{name} source={}", source.unwrap_or("-")),
        )?;
        Ok(self
            .parameters
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    async fn modify_cache_parameter_group(&self, name: &str, parameters: &[Parameter]) -> ApiResult<()> {
        let detail = parameters
            .iter()
            .map(|p| format!("{}={}", p.name, p.value))
            .collect::<Vec<_>>()
            .join(",");
        self.record("modify_cache_parameter_group", format!("{name} {detail}"))
    }

    async fn reset_cache_parameter_group(&self, name: &str, parameter_names: &[String]) -> ApiResult<()> {
        self.record(
            "reset_cache_parameter_group",
            format!("{name} {}", parameter_names.join(",")),
        )
    }

    async fn delete_cache_parameter_group(&self, name: &str) -> ApiResult<()> {
        self.record("delete_cache_parameter_group", name)
    }
}

#[async_trait]
impl UserGroupApi for FakeElastiCache {
    async fn create_user_group(&self, input: &CreateUserGroupInput) -> ApiResult<UserGroup> {
        let id = &input.user_group_id;
        self.record("create_user_group", format!("{id} tags={}", input.tags.len()))?;
        Ok(UserGroup {
            user_group_id: id.clone(),
            arn: Some(arn("usergroup", id)),
            status: "creating".to_string(),
            engine: Some(input.engine.clone()),
            user_ids: input.user_ids.clone(),
            ..Default::default()
        })
    }

    async fn describe_user_group(&self, user_group_id: &str) -> ApiResult<UserGroup> {
        self.record("describe_user_group", user_group_id)?;
        self.user_groups
            .next(user_group_id)
            .unwrap_or_else(|| Err(not_found("UserGroup", user_group_id)))
    }

    async fn modify_user_group(&self, input: &ModifyUserGroupInput) -> ApiResult<()> {
        self.record(
            "modify_user_group",
            format!(
                "{} add={} remove={}",
                input.user_group_id,
                input.user_ids_to_add.join(","),
                input.user_ids_to_remove.join(",")
            ),
        )
    }

    async fn delete_user_group(&self, user_group_id: &str) -> ApiResult<()> {
        self.record("delete_user_group", user_group_id)
    }
}

#[async_trait]
impl TagApi for FakeElastiCache {
    async fn list_tags(&self, arn: &str) -> ApiResult<Tags> {
        self.record("list_tags", arn)?;
        Ok(self.tags_of(arn))
    }

    async fn add_tags(&self, arn: &str, tags: &Tags) -> ApiResult<()> {
        let keys = tags.keys().cloned().collect::<Vec<_>>().join(",");
        self.record("add_tags", format!("{arn} {keys}"))?;
        self.tags
            .lock()
            .unwrap()
            .entry(arn.to_string())
            .or_default()
            .extend(tags.clone());
        Ok(())
    }

    async fn remove_tags(&self, arn: &str, keys: &[String]) -> ApiResult<()> {
        self.record("remove_tags", format!("{arn} {}", keys.join(",")))?;
        if let Some(tags) = self.tags.lock().unwrap().get_mut(arn) {
            for key in keys {
                tags.remove(key);
            }
        }
        Ok(())
    }
}

/// Context with the default timeouts and delays
pub fn context() -> Arc<ReconcileContext> {
    Arc::new(ReconcileContext::new(ReconcilerConfig::default()))
}

pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Single-shard replication group with one primary and `replicas` replicas
pub fn replication_group(id: &str, replicas: usize) -> ReplicationGroup {
    let members: Vec<NodeGroupMember> = (1..=replicas + 1)
        .map(|n| NodeGroupMember {
            cache_cluster_id: format!("{id}-{n:03}"),
            cache_node_id: Some("0001".to_string()),
            ..Default::default()
        })
        .collect();

    ReplicationGroup {
        replication_group_id: id.to_string(),
        arn: Some(arn("replicationgroup", id)),
        description: Some("test group".to_string()),
        status: "available".to_string(),
        member_clusters: members.iter().map(|m| m.cache_cluster_id.clone()).collect(),
        node_groups: vec![NodeGroup {
            node_group_id: "0001".to_string(),
            node_group_members: members,
            ..Default::default()
        }],
        automatic_failover: Some("enabled".to_string()),
        multi_az: Some("disabled".to_string()),
        ..Default::default()
    }
}

pub fn cache_cluster(id: &str) -> CacheCluster {
    CacheCluster {
        cache_cluster_id: id.to_string(),
        arn: Some(arn("cluster", id)),
        status: "available".to_string(),
        engine: Some("redis".to_string()),
        engine_version: Some("7.0.7".to_string()),
        cache_node_type: Some("cache.t3.micro".to_string()),
        num_cache_nodes: 1,
        ..Default::default()
    }
}

pub fn global_replication_group(id: &str, members: &[(&str, &str, &str)]) -> GlobalReplicationGroup {
    GlobalReplicationGroup {
        global_replication_group_id: id.to_string(),
        status: "available".to_string(),
        members: members
            .iter()
            .map(|(rg, region, role)| GlobalReplicationGroupMember {
                replication_group_id: rg.to_string(),
                replication_group_region: Some(region.to_string()),
                role: Some(role.to_string()),
                status: Some("associated".to_string()),
                automatic_failover: Some("enabled".to_string()),
            })
            .collect(),
        ..Default::default()
    }
}
