//! Global replication group lifecycle
//!
//! A global replication group is created around an existing primary
//! replication group and inherits most of its settings. Requested values
//! that differ from the inherited ones are converged right after creation,
//! one property per modify call.

use super::{ReadOptions, ReadOutcome, ReconcileContext, found, waiters};
use crate::client::GlobalReplicationGroupApi;
use crate::config::ResourceTimeouts;
use crate::diff::{ConfigDiff, DiffExt, ResourceDiff};
use crate::error::{CoreError, Result, ResultExt};
use crate::model::{
    CreateGlobalReplicationGroupInput, GlobalNodeGroup, GlobalReplicationGroup, ResourceKind,
};
use crate::planner::global_replication_group::fields;
use crate::planner::{GlobalReplicationGroupOp, PlannedOperation, plan_global_replication_group};
use crate::retry::retry_on_invalid_state;
use crate::status::{Classify, GlobalReplicationGroupStatus};
use crate::version::{self, ENGINE_VERSION_FIELD, EngineVersion, normalize_engine_version};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const KIND: ResourceKind = ResourceKind::GlobalReplicationGroup;

/// Normalized view of a global replication group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalReplicationGroupState {
    pub global_replication_group_id: String,
    pub arn: Option<String>,
    pub description: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub engine_version_actual: Option<String>,
    pub cache_node_type: Option<String>,
    pub cluster_enabled: Option<bool>,
    /// Taken from the primary member
    pub automatic_failover_enabled: Option<bool>,
    pub primary_replication_group_id: Option<String>,
    pub num_node_groups: i32,
    /// Sorted by id
    pub global_node_groups: Vec<GlobalNodeGroup>,
    pub at_rest_encryption_enabled: Option<bool>,
    pub transit_encryption_enabled: Option<bool>,
    pub auth_token_enabled: Option<bool>,
}

impl GlobalReplicationGroupState {
    fn from_group(group: &GlobalReplicationGroup, configured_version: Option<&str>) -> Result<Self> {
        let mut global_node_groups = group.global_node_groups.clone();
        global_node_groups.sort_by(|a, b| a.global_node_group_id.cmp(&b.global_node_group_id));

        let mut state = Self {
            global_replication_group_id: group.global_replication_group_id.clone(),
            arn: group.arn.clone(),
            description: group.description.clone(),
            engine: group.engine.clone(),
            cache_node_type: group.cache_node_type.clone(),
            cluster_enabled: group.cluster_enabled,
            automatic_failover_enabled: inherited_automatic_failover(group),
            primary_replication_group_id: group
                .primary_member()
                .map(|m| m.replication_group_id.clone()),
            num_node_groups: global_node_groups.len() as i32,
            global_node_groups,
            at_rest_encryption_enabled: group.at_rest_encryption_enabled,
            transit_encryption_enabled: group.transit_encryption_enabled,
            auth_token_enabled: group.auth_token_enabled,
            ..Default::default()
        };

        if let Some(actual) = group.engine_version.as_deref() {
            let (engine_version, actual) = normalize_engine_version(configured_version, actual)?;
            state.engine_version = Some(engine_version);
            state.engine_version_actual = Some(actual);
        }

        Ok(state)
    }
}

fn inherited_automatic_failover(group: &GlobalReplicationGroup) -> Option<bool> {
    let member = group.primary_member().or(group.members.first())?;
    member
        .automatic_failover
        .as_deref()
        .map(|status| status == "enabled")
}

/// Validate a planned change before any remote call
///
/// Marks `engine_version` for replacement on a downgrade and rejects a
/// parameter group change that is not part of an engine upgrade.
pub fn customize_diff<D: ResourceDiff + ?Sized>(diff: &mut D) -> Result<Vec<String>> {
    let mut replaced = Vec::new();
    if version::force_replacement_on_downgrade(diff)? {
        replaced.push(ENGINE_VERSION_FIELD.to_string());
    }

    if !diff.is_new_resource()
        && diff.change(fields::PARAMETER_GROUP_NAME).is_some()
        && diff.change(ENGINE_VERSION_FIELD).is_none()
    {
        return Err(CoreError::Validation(format!(
            "{} can only be changed together with {ENGINE_VERSION_FIELD}",
            fields::PARAMETER_GROUP_NAME
        )));
    }

    Ok(replaced)
}

/// Diff from the settings a new group inherited to the requested ones
fn convergence_diff(
    group: &GlobalReplicationGroup,
    input: &CreateGlobalReplicationGroupInput,
) -> Result<ConfigDiff> {
    let mut diff = ConfigDiff::for_new_resource();

    if let Some(requested) = input.automatic_failover_enabled {
        let inherited = inherited_automatic_failover(group).unwrap_or(false);
        diff = diff.with_change(fields::AUTOMATIC_FAILOVER_ENABLED, inherited, requested);
    }

    if let Some(requested) = input.cache_node_type.as_deref() {
        let inherited = group.cache_node_type.clone().unwrap_or_default();
        diff = diff.with_change(fields::CACHE_NODE_TYPE, inherited, requested);
    }

    if let (Some(requested), Some(actual)) =
        (input.engine_version.as_deref(), group.engine_version.as_deref())
    {
        if is_upgrade(requested, actual)? {
            diff = diff.with_change(ENGINE_VERSION_FIELD, actual, requested);
            if let Some(parameter_group) = input.parameter_group_name.as_deref() {
                diff = diff.with_added(fields::PARAMETER_GROUP_NAME, parameter_group);
            }
        }
    }

    if let Some(requested) = input.num_node_groups {
        diff = diff.with_change(
            fields::NUM_NODE_GROUPS,
            group.global_node_groups.len() as i32,
            requested,
        );
    }

    Ok(diff)
}

/// Whether `requested` asks for a newer engine than `actual`
///
/// A wildcard (`7.x`) only counts as an upgrade to a newer major.
fn is_upgrade(requested: &str, actual: &str) -> Result<bool> {
    let requested: EngineVersion = requested.parse()?;
    let actual: EngineVersion = actual.parse()?;
    if requested.is_wildcard() {
        return Ok(requested.major > actual.major);
    }
    Ok(requested > actual)
}

/// Reconciler for global replication groups
pub struct GlobalReplicationGroupReconciler<C> {
    client: Arc<C>,
    context: Arc<ReconcileContext>,
}

impl<C: GlobalReplicationGroupApi> GlobalReplicationGroupReconciler<C> {
    pub fn new(client: Arc<C>, context: Arc<ReconcileContext>) -> Self {
        Self { client, context }
    }

    fn timeouts(&self) -> &ResourceTimeouts {
        self.context.config.timeouts(KIND)
    }

    /// Create a global replication group and converge requested settings
    ///
    /// Returns the group as it stands after convergence.
    pub async fn create(
        &self,
        input: &CreateGlobalReplicationGroupInput,
    ) -> Result<GlobalReplicationGroup> {
        let suffix = input.global_replication_group_id_suffix.as_str();
        let client = &*self.client;

        info!(suffix = %suffix, primary = %input.primary_replication_group_id, "creating global replication group");
        let created = client
            .create_global_replication_group(input)
            .await
            .context(KIND, suffix, "creating")?;
        let id = created.global_replication_group_id.as_str();

        let group = self
            .wait_available(id, self.timeouts().create(), self.context.config.wait.create_delay())
            .await?;

        let diff = convergence_diff(&group, input)?;
        let ops = plan_global_replication_group(id, &diff, Some(&group))?;
        if ops.is_empty() {
            return Ok(group);
        }

        debug!(id = %id, count = ops.len(), "converging inherited settings");
        let mut group = group;
        for op in &ops {
            group = self.apply(id, op, self.timeouts().create()).await?;
        }
        Ok(group)
    }

    /// Read the normalized state of a global replication group
    pub async fn read(
        &self,
        id: &str,
        options: &ReadOptions,
    ) -> Result<ReadOutcome<GlobalReplicationGroupState>> {
        let group = match self.client.describe_global_replication_group(id).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() && !options.is_new_resource => {
                warn!(id = %id, "global replication group not found, removing from state");
                return Ok(ReadOutcome::Removed);
            }
            Err(e) => return Err(CoreError::api(KIND, id, "reading", e)),
        };

        let status = group.classify();
        if !options.is_new_resource
            && matches!(
                status,
                GlobalReplicationGroupStatus::Deleting | GlobalReplicationGroupStatus::Deleted
            )
        {
            warn!(id = %id, status = %status, "global replication group is being deleted, removing from state");
            return Ok(ReadOutcome::Removed);
        }

        let state = GlobalReplicationGroupState::from_group(
            &group,
            options.configured_engine_version.as_deref(),
        )?;
        Ok(ReadOutcome::Found(state))
    }

    /// Apply a planned change to an existing global replication group
    pub async fn update<D: ResourceDiff + ?Sized>(&self, id: &str, diff: &mut D) -> Result<()> {
        if let Some(field) = customize_diff(diff)?.into_iter().next() {
            return Err(CoreError::ReplacementRequired {
                kind: KIND,
                id: id.to_string(),
                field,
            });
        }

        let current = if diff.change(fields::NUM_NODE_GROUPS).is_some() {
            Some(
                self.client
                    .describe_global_replication_group(id)
                    .await
                    .context(KIND, id, "reading")?,
            )
        } else {
            None
        };

        let ops = plan_global_replication_group(id, diff, current.as_ref())?;
        for op in &ops {
            self.apply(id, op, self.timeouts().update()).await?;
        }
        Ok(())
    }

    async fn apply(
        &self,
        id: &str,
        op: &GlobalReplicationGroupOp,
        timeout: std::time::Duration,
    ) -> Result<GlobalReplicationGroup> {
        let client = &*self.client;
        let operation = op.name();

        info!(id = %id, operation, "updating global replication group");
        let result = match op {
            GlobalReplicationGroupOp::Modify(input) => {
                client.modify_global_replication_group(input).await
            }
            GlobalReplicationGroupOp::IncreaseNodeGroups { to, .. } => {
                client
                    .increase_node_groups_in_global_replication_group(id, *to)
                    .await
            }
            GlobalReplicationGroupOp::DecreaseNodeGroups {
                to,
                global_node_groups_to_retain,
                ..
            } => {
                client
                    .decrease_node_groups_in_global_replication_group(
                        id,
                        *to,
                        global_node_groups_to_retain,
                    )
                    .await
            }
        };
        result.context(KIND, id, operation)?;

        self.wait_available(id, timeout, self.context.config.wait.modify_delay())
            .await
    }

    async fn wait_available(
        &self,
        id: &str,
        timeout: std::time::Duration,
        delay: std::time::Duration,
    ) -> Result<GlobalReplicationGroup> {
        waiters::global_replication_group_available(&*self.client, &self.context, id, timeout, delay)
            .await
            .context(KIND, id, "waiting for")?
            .ok_or_else(|| CoreError::ResourceVanished {
                kind: KIND,
                id: id.to_string(),
            })
    }

    /// Delete a global replication group, keeping its primary
    ///
    /// A group that is already gone counts as deleted.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let client = &*self.client;
        let retry = &self.context.config.retry;
        let timeout = self.timeouts().delete();

        let Some(group) =
            found(client.describe_global_replication_group(id).await).context(KIND, id, "reading")?
        else {
            debug!(id = %id, "global replication group already gone");
            return Ok(());
        };

        if group.classify() == GlobalReplicationGroupStatus::Deleting {
            debug!(id = %id, "global replication group already deleting");
        } else {
            // pending modifications must finish before the group can be deleted
            self.wait_available(id, timeout, std::time::Duration::ZERO)
                .await?;

            info!(id = %id, "deleting global replication group");
            let result =
                retry_on_invalid_state(retry.global_replication_group_delete(), retry, || {
                    client.delete_global_replication_group(id, true)
                })
                .await;

            match result {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(id = %id, "global replication group already gone");
                    return Ok(());
                }
                Err(e) => return Err(CoreError::api(KIND, id, "deleting", e)),
            }
        }

        waiters::global_replication_group_deleted(
            client,
            &self.context,
            id,
            timeout,
            self.context.config.wait.delete_delay(),
        )
        .await
        .context(KIND, id, "waiting for deletion of")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GlobalReplicationGroupMember;
    use pretty_assertions::assert_eq;

    fn group() -> GlobalReplicationGroup {
        GlobalReplicationGroup {
            global_replication_group_id: "ldgnf-global".to_string(),
            status: "available".to_string(),
            engine_version: Some("6.2.6".to_string()),
            cache_node_type: Some("cache.m5.large".to_string()),
            members: vec![GlobalReplicationGroupMember {
                replication_group_id: "primary".to_string(),
                role: Some("primary".to_string()),
                automatic_failover: Some("enabled".to_string()),
                ..Default::default()
            }],
            global_node_groups: vec![
                GlobalNodeGroup {
                    global_node_group_id: "ldgnf-global-0002".to_string(),
                    slots: None,
                },
                GlobalNodeGroup {
                    global_node_group_id: "ldgnf-global-0001".to_string(),
                    slots: None,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_state_from_group() {
        let state = GlobalReplicationGroupState::from_group(&group(), Some("6.x")).unwrap();
        assert_eq!(state.automatic_failover_enabled, Some(true));
        assert_eq!(state.primary_replication_group_id.as_deref(), Some("primary"));
        assert_eq!(state.num_node_groups, 2);
        assert_eq!(state.global_node_groups[0].global_node_group_id, "ldgnf-global-0001");
        assert_eq!(state.engine_version.as_deref(), Some("6.x"));
        assert_eq!(state.engine_version_actual.as_deref(), Some("6.2.6"));
    }

    #[test]
    fn test_convergence_skips_inherited_values() {
        let mut input = CreateGlobalReplicationGroupInput::new("global", "primary");
        input.automatic_failover_enabled = Some(true);
        input.cache_node_type = Some("cache.m5.large".to_string());
        input.num_node_groups = Some(2);

        let diff = convergence_diff(&group(), &input).unwrap();
        let ops = plan_global_replication_group("ldgnf-global", &diff, Some(&group())).unwrap();

        assert_eq!(ops, vec![]);
    }

    #[test]
    fn test_convergence_upgrades_engine_with_parameter_group() {
        let mut input = CreateGlobalReplicationGroupInput::new("global", "primary");
        input.engine_version = Some("7.0".to_string());
        input.parameter_group_name = Some("default.redis7".to_string());
        input.automatic_failover_enabled = Some(false);

        let diff = convergence_diff(&group(), &input).unwrap();
        let ops = plan_global_replication_group("ldgnf-global", &diff, Some(&group())).unwrap();

        assert_eq!(ops.len(), 2);
        let GlobalReplicationGroupOp::Modify(failover) = &ops[0] else {
            panic!("expected modify");
        };
        assert_eq!(failover.automatic_failover_enabled, Some(false));
        let GlobalReplicationGroupOp::Modify(engine) = &ops[1] else {
            panic!("expected modify");
        };
        assert_eq!(engine.engine_version.as_deref(), Some("7.0"));
        assert_eq!(engine.cache_parameter_group_name.as_deref(), Some("default.redis7"));
    }

    #[test]
    fn test_is_upgrade() {
        assert!(is_upgrade("7.0", "6.2.6").unwrap());
        assert!(!is_upgrade("6.2", "6.2.6").unwrap());
        assert!(!is_upgrade("6.x", "6.2.6").unwrap());
        assert!(is_upgrade("7.x", "6.2.6").unwrap());
    }

    #[test]
    fn test_parameter_group_change_requires_engine_change() {
        let mut diff = ConfigDiff::new().with_change(
            fields::PARAMETER_GROUP_NAME,
            "default.redis6.x",
            "custom",
        );
        assert!(customize_diff(&mut diff).unwrap_err().is_validation());
    }
}
