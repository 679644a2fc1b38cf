//! Cache cluster lifecycle

use super::{
    ReadOptions, ReadOutcome, ReconcileContext, create_with_tag_fallback, tag_after_create,
    waiters,
};
use crate::client::{CacheClusterApi, TagApi};
use crate::config::ResourceTimeouts;
use crate::diff::{DiffExt, ResourceDiff};
use crate::error::{CoreError, Result, ResultExt};
use crate::model::{
    CacheCluster, CacheNode, CreateCacheClusterInput, LogDeliveryConfiguration, ResourceKind, Tags,
};
use crate::planner::cache_cluster::fields;
use crate::planner::{CacheClusterOp, PlannedOperation, TAGS_FIELD, plan_cache_cluster};
use crate::retry::retry_on_invalid_state;
use crate::tags::{list_tags, reconcile_tags};
use crate::version::{self, ENGINE_VERSION_FIELD, normalize_engine_version};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const KIND: ResourceKind = ResourceKind::CacheCluster;

/// Reported as the preferred zone when nodes span several zones
const MULTIPLE_AZS: &str = "Multiple";

pub const ENGINE_FIELD: &str = "engine";

/// Normalized view of a cache cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheClusterState {
    pub cache_cluster_id: String,
    pub arn: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub engine_version_actual: Option<String>,
    pub node_type: Option<String>,
    pub num_cache_nodes: i32,
    /// Sorted by node id
    pub cache_nodes: Vec<CacheNode>,
    /// "cross-az" when nodes span zones, otherwise "single-az"
    pub az_mode: Option<String>,
    /// Set only for single-zone clusters
    pub availability_zone: Option<String>,
    pub configuration_endpoint: Option<String>,
    pub cluster_address: Option<String>,
    pub port: Option<i32>,
    pub replication_group_id: Option<String>,
    pub parameter_group_name: Option<String>,
    pub subnet_group_name: Option<String>,
    pub security_group_ids: Vec<String>,
    pub maintenance_window: Option<String>,
    pub snapshot_window: Option<String>,
    pub snapshot_retention_limit: Option<i32>,
    pub notification_topic_arn: Option<String>,
    pub log_delivery_configurations: Vec<LogDeliveryConfiguration>,
    pub ip_discovery: Option<String>,
    pub network_type: Option<String>,
    pub transit_encryption_enabled: Option<bool>,
    pub at_rest_encryption_enabled: Option<bool>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub tags: Tags,
}

impl CacheClusterState {
    fn from_cluster(cluster: &CacheCluster, configured_version: Option<&str>) -> Result<Self> {
        let mut cache_nodes = cluster.cache_nodes.clone();
        cache_nodes.sort_by(|a, b| a.cache_node_id.cmp(&b.cache_node_id));
        let mut security_group_ids = cluster.security_group_ids.clone();
        security_group_ids.sort();
        let mut log_delivery_configurations = cluster.log_delivery_configurations.clone();
        log_delivery_configurations.sort();

        let mut state = Self {
            cache_cluster_id: cluster.cache_cluster_id.clone(),
            arn: cluster.arn.clone(),
            engine: cluster.engine.clone(),
            node_type: cluster.cache_node_type.clone(),
            num_cache_nodes: cluster.num_cache_nodes,
            replication_group_id: cluster.replication_group_id.clone(),
            parameter_group_name: cluster.cache_parameter_group_name.clone(),
            subnet_group_name: cluster.cache_subnet_group_name.clone(),
            security_group_ids,
            maintenance_window: cluster.maintenance_window.clone(),
            snapshot_window: cluster.snapshot_window.clone(),
            snapshot_retention_limit: cluster.snapshot_retention_limit,
            notification_topic_arn: cluster.notification_topic_arn.clone(),
            log_delivery_configurations,
            ip_discovery: cluster.ip_discovery.clone(),
            network_type: cluster.network_type.clone(),
            transit_encryption_enabled: cluster.transit_encryption_enabled,
            at_rest_encryption_enabled: cluster.at_rest_encryption_enabled,
            auto_minor_version_upgrade: cluster.auto_minor_version_upgrade,
            ..Default::default()
        };

        if cluster.preferred_availability_zone.as_deref() == Some(MULTIPLE_AZS) {
            state.az_mode = Some("cross-az".to_string());
        } else {
            state.az_mode = Some("single-az".to_string());
            state.availability_zone = cluster.preferred_availability_zone.clone();
        }

        if let Some(endpoint) = &cluster.configuration_endpoint {
            state.configuration_endpoint = Some(endpoint.to_string());
            state.cluster_address = Some(endpoint.address.clone());
            state.port = Some(endpoint.port);
        } else if let Some(endpoint) = cache_nodes.first().and_then(|n| n.endpoint.as_ref()) {
            state.port = Some(endpoint.port);
        }

        if let Some(actual) = cluster.engine_version.as_deref() {
            let (engine_version, actual) = normalize_engine_version(configured_version, actual)?;
            state.engine_version = Some(engine_version);
            state.engine_version_actual = Some(actual);
        }

        state.cache_nodes = cache_nodes;
        Ok(state)
    }
}

/// Validate a planned change before any remote call
///
/// Marks `engine_version` for replacement on a downgrade. Returns the fields
/// marked for replacement.
pub fn customize_diff<D: ResourceDiff + ?Sized>(diff: &mut D) -> Result<Vec<String>> {
    let engine: Option<String> = diff.new_value(ENGINE_FIELD)?;
    let num_cache_nodes: Option<i32> = diff.new_value(fields::NUM_CACHE_NODES)?;
    let az_mode: Option<String> = diff.new_value(fields::AZ_MODE)?;
    validate_nodes(engine.as_deref(), num_cache_nodes, az_mode.as_deref())?;

    let mut replaced = Vec::new();
    if version::force_replacement_on_downgrade(diff)? {
        replaced.push(ENGINE_VERSION_FIELD.to_string());
    }
    Ok(replaced)
}

fn validate_nodes(engine: Option<&str>, num_cache_nodes: Option<i32>, az_mode: Option<&str>) -> Result<()> {
    let Some(count) = num_cache_nodes else {
        return Ok(());
    };
    if engine == Some("redis") && count != 1 {
        return Err(CoreError::Validation(format!(
            "num_cache_nodes must be 1 for engine redis, got {count}"
        )));
    }
    if az_mode == Some("cross-az") && count < 2 {
        return Err(CoreError::Validation(
            "az_mode cross-az requires num_cache_nodes greater than 1".to_string(),
        ));
    }
    Ok(())
}

/// Reconciler for standalone cache clusters and replication group members
pub struct CacheClusterReconciler<C> {
    client: Arc<C>,
    context: Arc<ReconcileContext>,
}

impl<C> CacheClusterReconciler<C>
where
    C: CacheClusterApi + TagApi,
{
    pub fn new(client: Arc<C>, context: Arc<ReconcileContext>) -> Self {
        Self { client, context }
    }

    fn timeouts(&self) -> &ResourceTimeouts {
        self.context.config.timeouts(KIND)
    }

    /// Create a cache cluster and wait for it to become available
    pub async fn create(&self, input: &CreateCacheClusterInput) -> Result<CacheCluster> {
        let id = input.cache_cluster_id.as_str();

        match (&input.engine, &input.replication_group_id) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(CoreError::Validation(
                    "exactly one of engine or replication_group_id must be set".to_string(),
                ));
            }
            (Some(_), None) if input.num_cache_nodes.is_none() => {
                return Err(CoreError::Validation(
                    "num_cache_nodes is required unless replication_group_id is set".to_string(),
                ));
            }
            _ => {}
        }
        validate_nodes(input.engine.as_deref(), input.num_cache_nodes, input.az_mode.as_deref())?;

        if let Some(count) = input.num_cache_nodes {
            let zones = input.preferred_availability_zones.len();
            if zones > 0 && zones != count as usize {
                return Err(CoreError::Validation(format!(
                    "length of preferred_availability_zones ({zones}) must match num_cache_nodes ({count})"
                )));
            }
        }

        let tags = self.context.merged_tags(&input.tags);
        info!(id = %id, "creating cache cluster");

        let client = &*self.client;
        let (created, untagged) = create_with_tag_fallback(KIND, id, &tags, |tags| {
            let mut request = input.clone();
            request.tags = tags;
            async move { client.create_cache_cluster(&request).await }
        })
        .await?;

        let cluster = waiters::cache_cluster_available(
            client,
            &self.context,
            id,
            self.timeouts().create(),
            self.context.config.wait.create_delay(),
        )
        .await
        .context(KIND, id, "waiting for creation of")?
        .ok_or_else(|| CoreError::ResourceVanished {
            kind: KIND,
            id: id.to_string(),
        })?;

        let arn = cluster.arn.as_deref().or(created.arn.as_deref());
        tag_after_create(client, KIND, id, arn, &untagged, !input.tags.is_empty()).await?;

        info!(id = %id, "cache cluster available");
        Ok(cluster)
    }

    /// Read the normalized state of a cache cluster
    pub async fn read(&self, id: &str, options: &ReadOptions) -> Result<ReadOutcome<CacheClusterState>> {
        let cluster = match self.client.describe_cache_cluster(id).await {
            Ok(cluster) => cluster,
            Err(e) if e.is_not_found() && !options.is_new_resource => {
                warn!(id = %id, "cache cluster not found, removing from state");
                return Ok(ReadOutcome::Removed);
            }
            Err(e) => return Err(CoreError::api(KIND, id, "reading", e)),
        };

        let mut state =
            CacheClusterState::from_cluster(&cluster, options.configured_engine_version.as_deref())?;

        if let Some(arn) = state.arn.as_deref() {
            state.tags = list_tags(&*self.client, KIND, id, arn).await?;
        }

        Ok(ReadOutcome::Found(state))
    }

    /// Apply a planned change to an existing cache cluster
    pub async fn update<D: ResourceDiff + ?Sized>(&self, id: &str, diff: &mut D) -> Result<()> {
        if let Some(field) = customize_diff(diff)?.into_iter().next() {
            return Err(CoreError::ReplacementRequired {
                kind: KIND,
                id: id.to_string(),
                field,
            });
        }

        for op in plan_cache_cluster(id, diff)? {
            let operation = op.name();
            match op {
                CacheClusterOp::Modify(input) => {
                    info!(id = %id, operation, "updating cache cluster");
                    self.client
                        .modify_cache_cluster(&input)
                        .await
                        .context(KIND, id, operation)?;
                }
            }

            waiters::cache_cluster_available(
                &*self.client,
                &self.context,
                id,
                self.timeouts().update(),
                self.context.config.wait.modify_delay(),
            )
            .await
            .context(KIND, id, "waiting for update of")?;
        }

        if let Some(change) = diff.change(TAGS_FIELD) {
            let old: Tags = change.old_as()?.unwrap_or_default();
            let new: Tags = change.new_as()?.unwrap_or_default();
            let cluster = self
                .client
                .describe_cache_cluster(id)
                .await
                .context(KIND, id, "reading")?;
            if let Some(arn) = cluster.arn.as_deref() {
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

    /// Delete a cache cluster and wait until it is gone
    ///
    /// Deletion blocked by an in-progress operation is retried; a cluster that
    /// cannot be deleted (for example the primary of a replication group)
    /// fails immediately.
    pub async fn delete(&self, id: &str, final_snapshot_identifier: Option<&str>) -> Result<()> {
        let client = &*self.client;
        let retry = &self.context.config.retry;

        info!(id = %id, "deleting cache cluster");
        let result = retry_on_invalid_state(retry.cache_cluster_delete(), retry, || {
            client.delete_cache_cluster(id, final_snapshot_identifier)
        })
        .await;

        match result {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(id = %id, "cache cluster already gone");
                return Ok(());
            }
            Err(e) => return Err(CoreError::api(KIND, id, "deleting", e)),
        }

        waiters::cache_cluster_deleted(
            client,
            &self.context,
            id,
            self.timeouts().delete(),
            self.context.config.wait.delete_delay(),
        )
        .await
        .context(KIND, id, "waiting for deletion of")?;
        Ok(())
    }
}
