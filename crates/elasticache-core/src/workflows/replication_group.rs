//! Replication group lifecycle
//!
//! A replication group is a primary with replicas, optionally sharded into
//! node groups, and optionally a member of a global replication group. Most
//! settings are read from the group itself; engine, node type and a few
//! others only exist on its member clusters and are read from the first one.

use super::{
    ReadOptions, ReadOutcome, ReconcileContext, create_with_tag_fallback, found,
    tag_after_create, waiters,
};
use crate::client::{
    CacheClusterApi, GlobalReplicationGroupApi, ParameterGroupApi, ReplicationGroupApi, TagApi,
};
use crate::config::ResourceTimeouts;
use crate::diff::{DiffExt, ResourceDiff};
use crate::error::{CoreError, Result, ResultExt};
use crate::model::{
    CacheCluster, CreateReplicationGroupInput, DeleteReplicationGroupInput,
    DisassociateGlobalReplicationGroupInput, LogDeliveryConfiguration, ModifyReplicationGroupInput,
    ModifyShardConfigurationInput, ReplicaCountInput, ReplicationGroup, ResourceKind, Tags,
};
use crate::planner::replication_group::fields;
use crate::planner::{PlannedOperation, ReplicationGroupOp, TAGS_FIELD, plan_replication_group};
use crate::retry::{retry_on_invalid_state, retry_when};
use crate::status::{Classify, ReplicationGroupStatus};
use crate::tags::{list_tags, reconcile_tags};
use crate::version::{self, ENGINE_VERSION_FIELD, normalize_engine_version};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const KIND: ResourceKind = ResourceKind::ReplicationGroup;

/// Diff field carrying the engine version currently running
pub const ENGINE_VERSION_ACTUAL_FIELD: &str = "engine_version_actual";

/// Below this engine version, transit encryption can only be set at creation
const TRANSIT_ENCRYPTION_MODIFIABLE_SINCE: &str = "7.0.5";

const NOT_ASSOCIATED_MESSAGE: &str = "is not associated with Global Replication Group";

/// Normalized view of a replication group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplicationGroupState {
    pub replication_group_id: String,
    pub arn: Option<String>,
    pub description: Option<String>,
    pub global_replication_group_id: Option<String>,
    pub automatic_failover_enabled: Option<bool>,
    pub multi_az_enabled: Option<bool>,
    pub kms_key_id: Option<String>,
    pub num_cache_clusters: i32,
    /// Sorted member cluster ids
    pub member_clusters: Vec<String>,
    pub num_node_groups: i32,
    pub replicas_per_node_group: i32,
    pub cluster_enabled: Option<bool>,
    pub cluster_mode: Option<String>,
    pub data_tiering_enabled: bool,
    pub ip_discovery: Option<String>,
    pub network_type: Option<String>,
    /// Sorted by log type
    pub log_delivery_configurations: Vec<LogDeliveryConfiguration>,
    pub snapshot_window: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    pub port: Option<i32>,
    pub configuration_endpoint_address: Option<String>,
    pub primary_endpoint_address: Option<String>,
    pub reader_endpoint_address: Option<String>,
    /// Sorted user group ids
    pub user_group_ids: Vec<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub engine_version_actual: Option<String>,
    pub node_type: Option<String>,
    pub parameter_group_name: Option<String>,
    pub maintenance_window: Option<String>,
    pub notification_topic_arn: Option<String>,
    pub security_group_ids: Vec<String>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub at_rest_encryption_enabled: Option<bool>,
    pub transit_encryption_enabled: Option<bool>,
    pub transit_encryption_mode: Option<String>,
    pub auth_token_enabled: Option<bool>,
    pub tags: Tags,
}

fn automatic_failover_enabled(id: &str, value: Option<&str>) -> Option<bool> {
    match value {
        Some("enabled" | "enabling") => Some(true),
        Some("disabled" | "disabling") => Some(false),
        None => None,
        Some(other) => {
            warn!(id = %id, value = ?other, "unknown automatic failover state");
            None
        }
    }
}

fn multi_az_enabled(id: &str, value: Option<&str>) -> Option<bool> {
    match value {
        Some("enabled") => Some(true),
        Some("disabled") => Some(false),
        None => None,
        Some(other) => {
            warn!(id = %id, value = ?other, "unknown multi-AZ state");
            None
        }
    }
}

impl ReplicationGroupState {
    fn from_group(group: &ReplicationGroup) -> Self {
        let mut member_clusters = group.member_clusters.clone();
        member_clusters.sort();
        let mut user_group_ids = group.user_group_ids.clone();
        user_group_ids.sort();
        let mut log_delivery_configurations = group.log_delivery_configurations.clone();
        log_delivery_configurations.sort();

        let first_node_group = group.node_groups.first();
        let replicas_per_node_group = first_node_group
            .map(|ng| ng.node_group_members.len() as i32 - 1)
            .unwrap_or(0)
            .max(0);

        let mut state = Self {
            replication_group_id: group.replication_group_id.clone(),
            arn: group.arn.clone(),
            description: group.description.clone(),
            global_replication_group_id: group.global_replication_group_id.clone(),
            automatic_failover_enabled: automatic_failover_enabled(
                &group.replication_group_id,
                group.automatic_failover.as_deref(),
            ),
            multi_az_enabled: multi_az_enabled(&group.replication_group_id, group.multi_az.as_deref()),
            kms_key_id: group.kms_key_id.clone(),
            num_cache_clusters: group.member_clusters.len() as i32,
            member_clusters,
            num_node_groups: group.node_groups.len() as i32,
            replicas_per_node_group,
            cluster_enabled: group.cluster_enabled,
            cluster_mode: group.cluster_mode.clone(),
            data_tiering_enabled: group.data_tiering.as_deref() == Some("enabled"),
            ip_discovery: group.ip_discovery.clone(),
            network_type: group.network_type.clone(),
            log_delivery_configurations,
            snapshot_window: group.snapshot_window.clone(),
            snapshot_retention_limit: group.snapshot_retention_limit,
            user_group_ids,
            ..Default::default()
        };

        if let Some(endpoint) = &group.configuration_endpoint {
            state.port = Some(endpoint.port);
            state.configuration_endpoint_address = Some(endpoint.address.clone());
        } else if let Some(node_group) = first_node_group {
            if let Some(endpoint) = &node_group.primary_endpoint {
                state.port = Some(endpoint.port);
                state.primary_endpoint_address = Some(endpoint.address.clone());
            }
            if let Some(endpoint) = &node_group.reader_endpoint {
                state.reader_endpoint_address = Some(endpoint.address.clone());
            }
        }

        state
    }

    fn apply_member_cluster(&mut self, cluster: &CacheCluster, configured_version: Option<&str>) -> Result<()> {
        self.engine = cluster.engine.clone();
        self.node_type = cluster.cache_node_type.clone();
        self.parameter_group_name = cluster.cache_parameter_group_name.clone();
        self.maintenance_window = cluster.maintenance_window.clone();
        self.notification_topic_arn = cluster.notification_topic_arn.clone();
        self.auto_minor_version_upgrade = cluster.auto_minor_version_upgrade;
        self.security_group_ids = cluster.security_group_ids.clone();
        self.security_group_ids.sort();
        self.at_rest_encryption_enabled = cluster.at_rest_encryption_enabled;
        self.transit_encryption_enabled = cluster.transit_encryption_enabled;
        self.transit_encryption_mode = cluster.transit_encryption_mode.clone();
        self.auth_token_enabled = cluster.auth_token_enabled;

        if let Some(actual) = cluster.engine_version.as_deref() {
            let (engine_version, actual) = normalize_engine_version(configured_version, actual)?;
            self.engine_version = Some(engine_version);
            self.engine_version_actual = Some(actual);
        }
        Ok(())
    }
}

/// Options for deleting a replication group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReplicationGroupOptions {
    /// Global replication group to leave before deleting
    pub global_replication_group_id: Option<String>,
    pub final_snapshot_identifier: Option<String>,
    /// Parameter group created for the global replication group membership,
    /// deleted after the group is gone
    pub parameter_group_name: Option<String>,
}

/// Reconciler for replication groups
pub struct ReplicationGroupReconciler<C> {
    client: Arc<C>,
    context: Arc<ReconcileContext>,
}

impl<C> ReplicationGroupReconciler<C>
where
    C: ReplicationGroupApi + CacheClusterApi + GlobalReplicationGroupApi + ParameterGroupApi + TagApi,
{
    pub fn new(client: Arc<C>, context: Arc<ReconcileContext>) -> Self {
        Self { client, context }
    }

    fn timeouts(&self) -> &ResourceTimeouts {
        self.context.config.timeouts(KIND)
    }

    /// Create a replication group and wait for it to become available
    pub async fn create(&self, input: &CreateReplicationGroupInput) -> Result<ReplicationGroup> {
        let id = input.replication_group_id.as_str();
        let timeouts = self.timeouts();
        let wait = &self.context.config.wait;

        validate_failover(
            input.multi_az_enabled,
            input.automatic_failover_enabled,
            input.num_cache_clusters,
        )?;

        let mut request = input.clone();
        if request.global_replication_group_id.is_some() {
            // node type and engine come from the global replication group
            request.node_type = None;
            request.engine = None;
        } else if request.node_type.as_deref().unwrap_or_default().is_empty() {
            return Err(CoreError::Validation(
                "node_type is required unless global_replication_group_id is set".to_string(),
            ));
        }

        let tags = self.context.merged_tags(&input.tags);
        info!(id = %id, "creating replication group");

        let client = &*self.client;
        let (created, untagged) = create_with_tag_fallback(KIND, id, &tags, |tags| {
            let mut request = request.clone();
            request.tags = tags;
            async move { client.create_replication_group(&request).await }
        })
        .await?;

        let group = waiters::replication_group_available(
            client,
            &self.context,
            id,
            timeouts.create(),
            wait.create_delay(),
        )
        .await
        .context(KIND, id, "waiting for creation of")?
        .ok_or_else(|| CoreError::ResourceVanished {
            kind: KIND,
            id: id.to_string(),
        })?;

        if let Some(global_id) = input.global_replication_group_id.as_deref() {
            // the group can be available before the global group finishes adding it
            waiters::global_replication_group_available(
                client,
                &self.context,
                global_id,
                self.context.config.global_replication_group.create(),
                wait.create_delay(),
            )
            .await
            .context(ResourceKind::GlobalReplicationGroup, global_id, "waiting for membership of")?;
        }

        let arn = group.arn.as_deref().or(created.arn.as_deref());
        tag_after_create(client, KIND, id, arn, &untagged, !input.tags.is_empty()).await?;

        info!(id = %id, "replication group available");
        Ok(group)
    }

    /// Read the normalized state of a replication group
    ///
    /// Waits for the group to be available before reading member clusters
    /// and tags.
    pub async fn read(&self, id: &str, options: &ReadOptions) -> Result<ReadOutcome<ReplicationGroupState>> {
        let client = &*self.client;

        let group = match client.describe_replication_group(id).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() && !options.is_new_resource => {
                warn!(id = %id, "replication group not found, removing from state");
                return Ok(ReadOutcome::Removed);
            }
            Err(e) => return Err(CoreError::api(KIND, id, "reading", e)),
        };

        if group.classify() == ReplicationGroupStatus::Deleting {
            warn!(id = %id, "replication group is deleting, removing from state");
            return Ok(ReadOutcome::Removed);
        }

        let mut state = ReplicationGroupState::from_group(&group);

        waiters::replication_group_available(
            client,
            &self.context,
            id,
            self.timeouts().update(),
            Duration::ZERO,
        )
        .await
        .context(KIND, id, "waiting before reading")?;

        let first_member = group
            .node_groups
            .first()
            .and_then(|ng| ng.node_group_members.first());
        if let Some(member) = first_member {
            debug!(id = %id, cluster = %member.cache_cluster_id, "reading member cluster");
            let cluster = found(client.describe_cache_cluster(&member.cache_cluster_id).await)
                .context(KIND, id, "reading member cluster of")?;
            if let Some(cluster) = cluster {
                state.apply_member_cluster(&cluster, options.configured_engine_version.as_deref())?;
            }
        }

        if let Some(arn) = state.arn.as_deref() {
            state.tags = list_tags(client, KIND, id, arn).await?;
        }

        Ok(ReadOutcome::Found(state))
    }

    /// Apply a planned change to an existing replication group
    pub async fn update<D: ResourceDiff + ?Sized>(&self, id: &str, diff: &mut D) -> Result<()> {
        if let Some(field) = customize_diff(diff)?.into_iter().next() {
            return Err(CoreError::ReplacementRequired {
                kind: KIND,
                id: id.to_string(),
                field,
            });
        }

        let ops = plan_replication_group(id, diff)?;
        debug!(id = %id, count = ops.len(), "planned replication group update");

        for op in &ops {
            self.apply(id, op).await?;
        }

        if let Some(change) = diff.change(TAGS_FIELD) {
            let old: Tags = change.old_as()?.unwrap_or_default();
            let new: Tags = change.new_as()?.unwrap_or_default();
            let group = self
                .client
                .describe_replication_group(id)
                .await
                .context(KIND, id, "reading")?;
            if let Some(arn) = group.arn.as_deref() {
                reconcile_tags(
                    &*self.client,
                    KIND,
                    id,
                    arn,
                    &self.context.merged_tags(&old),
                    &self.context.merged_tags(&new),
                    !new.is_empty(),
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn apply(&self, id: &str, op: &ReplicationGroupOp) -> Result<()> {
        let client = &*self.client;
        let update_timeout = self.timeouts().update();
        let modify_delay = self.context.config.wait.modify_delay();
        let operation = op.name();

        info!(id = %id, operation, "updating replication group");

        match op {
            ReplicationGroupOp::ModifyNodeGroupCount {
                to,
                node_groups_to_remove,
                ..
            } => {
                let input = ModifyShardConfigurationInput {
                    replication_group_id: id.to_string(),
                    apply_immediately: true,
                    node_group_count: *to,
                    node_groups_to_remove: node_groups_to_remove.clone(),
                };
                client
                    .modify_replication_group_shard_configuration(&input)
                    .await
                    .context(KIND, id, operation)?;
                self.wait_available(id, update_timeout, modify_delay).await
            }
            ReplicationGroupOp::IncreaseReplicasPerNodeGroup { .. }
            | ReplicationGroupOp::DecreaseReplicasPerNodeGroup { .. } => {
                let input = self.replica_count_input(id, op)?;
                let result = if matches!(op, ReplicationGroupOp::IncreaseReplicasPerNodeGroup { .. }) {
                    client.increase_replica_count(&input).await
                } else {
                    client.decrease_replica_count(&input).await
                };
                result.context(KIND, id, operation)?;
                self.wait_available(id, update_timeout, modify_delay).await
            }
            ReplicationGroupOp::IncreaseCacheClusters { .. }
            | ReplicationGroupOp::DecreaseCacheClusters { .. } => {
                let input = self.replica_count_input(id, op)?;
                let result = if matches!(op, ReplicationGroupOp::IncreaseCacheClusters { .. }) {
                    client.increase_replica_count(&input).await
                } else {
                    client.decrease_replica_count(&input).await
                };
                result.context(KIND, id, operation)?;
                waiters::replication_group_member_clusters_available(
                    client,
                    &self.context,
                    id,
                    update_timeout,
                    modify_delay,
                )
                .await
                .context(KIND, id, "waiting for member clusters of")?;
                Ok(())
            }
            ReplicationGroupOp::Modify(input) => {
                // tagging can leave the group briefly unavailable
                self.wait_available(id, update_timeout, modify_delay).await?;
                client
                    .modify_replication_group(input)
                    .await
                    .context(KIND, id, operation)?;
                self.wait_available(id, update_timeout, modify_delay).await
            }
            ReplicationGroupOp::UpdateAuthToken { auth_token, strategy } => {
                let mut input = ModifyReplicationGroupInput::new(id, true);
                input.auth_token = auth_token.clone();
                input.auth_token_update_strategy = strategy.clone();

                self.wait_available(id, update_timeout, Duration::ZERO).await?;
                client
                    .modify_replication_group(&input)
                    .await
                    .context(KIND, id, operation)?;
                self.wait_available(id, update_timeout, Duration::ZERO).await
            }
        }
    }

    fn replica_count_input(&self, id: &str, op: &ReplicationGroupOp) -> Result<ReplicaCountInput> {
        let new_replica_count = op.new_replica_count().ok_or_else(|| {
            CoreError::Validation(format!("{} has no replica count", op.name()))
        })?;
        Ok(ReplicaCountInput {
            replication_group_id: id.to_string(),
            apply_immediately: true,
            new_replica_count,
        })
    }

    async fn wait_available(&self, id: &str, timeout: Duration, delay: Duration) -> Result<()> {
        waiters::replication_group_available(&*self.client, &self.context, id, timeout, delay)
            .await
            .context(KIND, id, "waiting for update of")?;
        Ok(())
    }

    /// Delete a replication group and wait until it is gone
    ///
    /// A member of a global replication group is disassociated first. A group
    /// that is already gone counts as deleted.
    pub async fn delete(&self, id: &str, options: &DeleteReplicationGroupOptions) -> Result<()> {
        let client = &*self.client;
        let timeouts = self.timeouts();
        let retry = &self.context.config.retry;

        if let Some(global_id) = options.global_replication_group_id.as_deref() {
            self.disassociate(global_id, id, timeouts.delete()).await?;
        }

        let input = DeleteReplicationGroupInput {
            replication_group_id: id.to_string(),
            final_snapshot_identifier: options.final_snapshot_identifier.clone(),
        };

        info!(id = %id, "deleting replication group");
        let result = retry_on_invalid_state(retry.replication_group_delete(), retry, || {
            client.delete_replication_group(&input)
        })
        .await;

        match result {
            Err(e) if e.is_not_found() => {
                debug!(id = %id, "replication group already gone");
            }
            Err(e) => return Err(CoreError::api(KIND, id, "deleting", e)),
            Ok(()) => {
                waiters::replication_group_deleted(
                    client,
                    &self.context,
                    id,
                    timeouts.delete(),
                    self.context.config.wait.delete_delay(),
                )
                .await
                .context(KIND, id, "waiting for deletion of")?;
            }
        }

        if options.global_replication_group_id.is_some() {
            if let Some(name) = options.parameter_group_name.as_deref().filter(|n| !n.is_empty()) {
                self.delete_parameter_group(name).await?;
            }
        }

        Ok(())
    }

    async fn disassociate(&self, global_id: &str, id: &str, timeout: Duration) -> Result<()> {
        let client = &*self.client;
        let retry = &self.context.config.retry;

        let group = found(client.describe_global_replication_group(global_id).await)
            .context(ResourceKind::GlobalReplicationGroup, global_id, "reading")?;
        let Some(member) = group.as_ref().and_then(|g| g.member(id)) else {
            debug!(id = %id, global_id = %global_id, "not a member of the global replication group");
            return Ok(());
        };

        let input = DisassociateGlobalReplicationGroupInput {
            global_replication_group_id: global_id.to_string(),
            replication_group_id: id.to_string(),
            replication_group_region: member.replication_group_region.clone().unwrap_or_default(),
        };

        info!(id = %id, global_id = %global_id, "disassociating replication group from global replication group");
        let result = retry_when(timeout, retry, |e| e.is_invalid_state(), || {
            client.disassociate_global_replication_group(&input)
        })
        .await;

        match result {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(global_id = %global_id, "global replication group already gone");
                return Ok(());
            }
            Err(e) if e.is_invalid_parameter() && e.message_contains(NOT_ASSOCIATED_MESSAGE) => {
                debug!(id = %id, global_id = %global_id, "replication group already disassociated");
                return Ok(());
            }
            Err(e) => return Err(CoreError::api(KIND, id, "disassociating", e)),
        }

        waiters::global_replication_group_member_detached(
            client,
            &self.context,
            global_id,
            id,
            timeout,
            self.context.config.wait.delete_delay(),
        )
        .await
        .context(KIND, id, "waiting for disassociation of")?;
        Ok(())
    }

    async fn delete_parameter_group(&self, name: &str) -> Result<()> {
        let client = &*self.client;
        let retry = &self.context.config.retry;

        info!(name = %name, "deleting parameter group left by global replication group membership");
        match retry_on_invalid_state(retry.parameter_group_delete(), retry, || {
            client.delete_cache_parameter_group(name)
        })
        .await
        {
            Err(e) if e.is_not_found() => Ok(()),
            result => result.context(ResourceKind::ParameterGroup, name, "deleting"),
        }
    }
}

/// Validate a planned change before any remote call
///
/// Marks `engine_version` for replacement on a downgrade, and
/// `transit_encryption_enabled` when the running engine cannot change it
/// in place. Returns the fields marked for replacement.
pub fn customize_diff<D: ResourceDiff + ?Sized>(diff: &mut D) -> Result<Vec<String>> {
    let multi_az: bool = diff.new_value(fields::MULTI_AZ_ENABLED)?.unwrap_or(false);
    let failover: bool = diff
        .new_value(fields::AUTOMATIC_FAILOVER_ENABLED)?
        .unwrap_or(false);
    let num_cache_clusters: Option<i32> = diff.new_value(fields::NUM_CACHE_CLUSTERS)?;
    validate_failover(multi_az, failover, num_cache_clusters)?;

    let mut replaced = Vec::new();
    if version::force_replacement_on_downgrade(diff)? {
        replaced.push(ENGINE_VERSION_FIELD.to_string());
    }

    if !diff.is_new_resource() && diff.change(fields::TRANSIT_ENCRYPTION_ENABLED).is_some() {
        let actual: Option<String> = diff.old_value(ENGINE_VERSION_ACTUAL_FIELD)?;
        if let Some(actual) = actual {
            if version::compare(&actual, TRANSIT_ENCRYPTION_MODIFIABLE_SINCE)?.is_lt() {
                diff.force_replacement(fields::TRANSIT_ENCRYPTION_ENABLED);
                replaced.push(fields::TRANSIT_ENCRYPTION_ENABLED.to_string());
            }
        }
    }

    Ok(replaced)
}

fn validate_failover(multi_az: bool, failover: bool, num_cache_clusters: Option<i32>) -> Result<()> {
    if multi_az && !failover {
        return Err(CoreError::Validation(
            "automatic_failover_enabled must be true if multi_az_enabled is true".to_string(),
        ));
    }
    if failover {
        if let Some(count) = num_cache_clusters {
            if count < 2 {
                return Err(CoreError::Validation(
                    "num_cache_clusters must be at least 2 if automatic_failover_enabled is true"
                        .to_string(),
                ));
            }
        }
    }
    Ok(())
}
