//! Parameter group lifecycle
//!
//! Parameter changes are applied as resets followed by modifications, in
//! batches. Resetting `reserved-memory` fails on engine families that have
//! replaced it with `reserved-memory-percent`; that case is worked around by
//! switching the percentage parameter to its neutral value and resetting it.

use super::{ReadOptions, ReadOutcome, ReconcileContext, create_with_tag_fallback, tag_after_create};
use crate::client::{ApiResult, ParameterGroupApi, TagApi};
use crate::diff::{DiffExt, ResourceDiff};
use crate::error::{ApiError, CoreError, Result, ResultExt};
use crate::model::{CacheParameterGroup, CreateCacheParameterGroupInput, Parameter, ResourceKind, Tags};
use crate::planner::parameter_group::{fields, plan_parameter_changes};
use crate::planner::{
    ParameterChanges, ParameterGroupOp, PlannedOperation, TAGS_FIELD, plan_parameter_group,
};
use crate::retry::{retry_on_invalid_state, retry_when};
use crate::tags::{list_tags, reconcile_tags};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const KIND: ResourceKind = ResourceKind::ParameterGroup;

const RESERVED_MEMORY: &str = "reserved-memory";
const RESERVED_MEMORY_PERCENT: &str = "reserved-memory-percent";
const RESERVED_MEMORY_MISSING: &str = "Parameter reserved-memory doesn't exist";
const PENDING_CHANGES: &str = "has pending changes";

/// Families that predate `reserved-memory-percent`
const FAMILIES_WITHOUT_RESERVED_MEMORY_PERCENT: &[&str] = &["redis2.6", "redis2.8"];

/// Normalized view of a parameter group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterGroupState {
    /// Lower-cased
    pub name: String,
    pub family: String,
    pub description: Option<String>,
    pub arn: Option<String>,
    /// User-modified parameters, sorted by name
    pub parameters: Vec<Parameter>,
    pub tags: Tags,
}

/// Reconciler for cache parameter groups
pub struct ParameterGroupReconciler<C> {
    client: Arc<C>,
    context: Arc<ReconcileContext>,
}

impl<C> ParameterGroupReconciler<C>
where
    C: ParameterGroupApi + TagApi,
{
    pub fn new(client: Arc<C>, context: Arc<ReconcileContext>) -> Self {
        Self { client, context }
    }

    /// Create a parameter group and apply its parameters
    pub async fn create(&self, input: &CreateCacheParameterGroupInput) -> Result<CacheParameterGroup> {
        let name = input.name.as_str();
        let client = &*self.client;
        let tags = self.context.merged_tags(&input.tags);

        info!(name = %name, family = %input.family, "creating parameter group");
        let (group, untagged) = create_with_tag_fallback(KIND, name, &tags, |tags| {
            let request = CreateCacheParameterGroupInput {
                parameters: Vec::new(),
                tags,
                ..input.clone()
            };
            async move { client.create_cache_parameter_group(&request).await }
        })
        .await?;

        let changes = ParameterChanges {
            remove: Vec::new(),
            upsert: input.parameters.clone(),
        };
        for op in plan_parameter_changes(&changes) {
            self.apply(name, &input.family, &op, &input.parameters).await?;
        }

        tag_after_create(
            client,
            KIND,
            name,
            group.arn.as_deref(),
            &untagged,
            !input.tags.is_empty(),
        )
        .await?;

        Ok(group)
    }

    /// Read the normalized state of a parameter group
    pub async fn read(&self, name: &str, options: &ReadOptions) -> Result<ReadOutcome<ParameterGroupState>> {
        let client = &*self.client;

        let group = match client.describe_cache_parameter_group(name).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() && !options.is_new_resource => {
                warn!(name = %name, "parameter group not found, removing from state");
                return Ok(ReadOutcome::Removed);
            }
            Err(e) => return Err(CoreError::api(KIND, name, "reading", e)),
        };

        let mut parameters = client
            .describe_cache_parameters(name, Some("user"))
            .await
            .context(KIND, name, "reading parameters of")?;
        parameters.sort_by(|a, b| a.name.cmp(&b.name));

        let tags = match group.arn.as_deref() {
            Some(arn) => list_tags(client, KIND, name, arn).await?,
            None => Tags::new(),
        };

        Ok(ReadOutcome::Found(ParameterGroupState {
            name: group.name.to_lowercase(),
            family: group.family,
            description: group.description,
            arn: group.arn,
            parameters,
            tags,
        }))
    }

    /// Apply a planned parameter and tag change
    pub async fn update<D: ResourceDiff + ?Sized>(&self, name: &str, diff: &D) -> Result<()> {
        let ops = plan_parameter_group(diff)?;

        if !ops.is_empty() {
            let family = match diff.new_value::<String>(fields::FAMILY)? {
                Some(family) => family,
                None => {
                    self.client
                        .describe_cache_parameter_group(name)
                        .await
                        .context(KIND, name, "reading")?
                        .family
                }
            };
            let desired: Vec<Parameter> = diff.new_value(fields::PARAMETER)?.unwrap_or_default();

            for op in &ops {
                self.apply(name, &family, op, &desired).await?;
            }
        }

        if let Some(change) = diff.change(TAGS_FIELD) {
            let old: Tags = change.old_as()?.unwrap_or_default();
            let new: Tags = change.new_as()?.unwrap_or_default();
            let group = self
                .client
                .describe_cache_parameter_group(name)
                .await
                .context(KIND, name, "reading")?;
            if let Some(arn) = group.arn.as_deref() {
                reconcile_tags(
                    &*self.client,
                    KIND,
                    name,
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

    async fn apply(
        &self,
        name: &str,
        family: &str,
        op: &ParameterGroupOp,
        desired: &[Parameter],
    ) -> Result<()> {
        let operation = op.name();
        match op {
            ParameterGroupOp::Modify(parameters) => {
                debug!(name = %name, count = parameters.len(), "modifying parameters");
                self.client
                    .modify_cache_parameter_group(name, parameters)
                    .await
                    .context(KIND, name, operation)
            }
            ParameterGroupOp::Reset(names) => self.reset_batch(name, family, names, desired).await,
        }
    }

    async fn reset_batch(
        &self,
        name: &str,
        family: &str,
        names: &[String],
        desired: &[Parameter],
    ) -> Result<()> {
        debug!(name = %name, count = names.len(), "resetting parameters");
        let err = match self.reset(name, names).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        if !is_reserved_memory_failure(&err) || !names.iter().any(|n| n == RESERVED_MEMORY) {
            return Err(CoreError::api(KIND, name, "resetting parameters of", err));
        }

        warn!(name = %name, error = %err, "resetting {RESERVED_MEMORY} failed");
        let remaining: Vec<String> = names
            .iter()
            .filter(|n| n.as_str() != RESERVED_MEMORY)
            .cloned()
            .collect();

        if desired.iter().any(|p| p.name == RESERVED_MEMORY_PERCENT) {
            debug!(name = %name, "{RESERVED_MEMORY_PERCENT} is configured, not touching it");
        } else if !supports_reserved_memory_percent(family) {
            warn!(name = %name, family = %family, "family has no {RESERVED_MEMORY_PERCENT}, skipping workaround");
        } else {
            self.neutralize_reserved_memory_percent(name).await;
        }

        if remaining.is_empty() {
            return Ok(());
        }
        self.reset(name, &remaining)
            .await
            .context(KIND, name, "resetting parameters of")
    }

    /// Set `reserved-memory-percent` to 0, then reset it to its default
    ///
    /// Failures are logged and otherwise ignored.
    async fn neutralize_reserved_memory_percent(&self, name: &str) {
        info!(name = %name, "switching {RESERVED_MEMORY_PERCENT} to 0 before resetting it");
        let neutral = [Parameter::new(RESERVED_MEMORY_PERCENT, "0")];
        if let Err(e) = self.client.modify_cache_parameter_group(name, &neutral).await {
            warn!(name = %name, error = %e, "failed to set {RESERVED_MEMORY_PERCENT} to 0");
            return;
        }
        if let Err(e) = self.reset(name, &[RESERVED_MEMORY_PERCENT.to_string()]).await {
            warn!(name = %name, error = %e, "failed to reset {RESERVED_MEMORY_PERCENT}");
        }
    }

    /// Reset, retrying while the group has pending changes
    async fn reset(&self, name: &str, names: &[String]) -> ApiResult<()> {
        let client = &*self.client;
        let retry = &self.context.config.retry;
        retry_when(
            retry.parameter_reset(),
            retry,
            |e| e.is_invalid_state() && e.message_contains(PENDING_CHANGES),
            || client.reset_cache_parameter_group(name, names),
        )
        .await
    }

    /// Delete a parameter group; a group that is already gone counts as deleted
    pub async fn delete(&self, name: &str) -> Result<()> {
        let client = &*self.client;
        let retry = &self.context.config.retry;

        info!(name = %name, "deleting parameter group");
        match retry_on_invalid_state(retry.parameter_group_delete(), retry, || {
            client.delete_cache_parameter_group(name)
        })
        .await
        {
            Err(e) if e.is_not_found() => {
                debug!(name = %name, "parameter group already gone");
                Ok(())
            }
            result => result.context(KIND, name, "deleting"),
        }
    }
}

/// Failure signatures of resetting `reserved-memory` where it no longer exists
fn is_reserved_memory_failure(err: &ApiError) -> bool {
    (err.is_invalid_parameter() && err.message_contains(RESERVED_MEMORY_MISSING))
        || err.is_timeout()
        || (err.is_invalid_state() && err.message_contains(PENDING_CHANGES))
}

fn supports_reserved_memory_percent(family: &str) -> bool {
    !FAMILIES_WITHOUT_RESERVED_MEMORY_PERCENT.contains(&family) && !family.starts_with("memcached")
}
