//! User group lifecycle

use super::{
    ReadOptions, ReadOutcome, ReconcileContext, create_with_tag_fallback, tag_after_create,
    waiters,
};
use crate::client::{TagApi, UserGroupApi};
use crate::config::ResourceTimeouts;
use crate::diff::{DiffExt, ResourceDiff};
use crate::error::{CoreError, Result, ResultExt};
use crate::model::{CreateUserGroupInput, ResourceKind, Tags, UserGroup};
use crate::planner::{PlannedOperation, TAGS_FIELD, UserGroupOp, plan_user_group};
use crate::status::{Classify, UserGroupStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const KIND: ResourceKind = ResourceKind::UserGroup;

/// Normalized view of a user group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserGroupState {
    pub user_group_id: String,
    pub arn: Option<String>,
    pub engine: Option<String>,
    /// Sorted
    pub user_ids: Vec<String>,
    pub tags: Tags,
}

impl From<&UserGroup> for UserGroupState {
    fn from(group: &UserGroup) -> Self {
        let mut user_ids = group.user_ids.clone();
        user_ids.sort();
        Self {
            user_group_id: group.user_group_id.clone(),
            arn: group.arn.clone(),
            engine: group.engine.clone(),
            user_ids,
            tags: Tags::new(),
        }
    }
}

pub struct UserGroupReconciler<C> {
    client: Arc<C>,
    context: Arc<ReconcileContext>,
}

impl<C> UserGroupReconciler<C>
where
    C: UserGroupApi + TagApi,
{
    pub fn new(client: Arc<C>, context: Arc<ReconcileContext>) -> Self {
        Self { client, context }
    }

    fn timeouts(&self) -> &ResourceTimeouts {
        self.context.config.timeouts(KIND)
    }

    /// Create a user group and wait for it to become active
    pub async fn create(&self, input: &CreateUserGroupInput) -> Result<UserGroup> {
        let id = input.user_group_id.as_str();
        let client = &*self.client;
        let tags = self.context.merged_tags(&input.tags);

        info!(id = %id, users = input.user_ids.len(), "creating user group");
        let (created, untagged) = create_with_tag_fallback(KIND, id, &tags, |tags| {
            let mut request = input.clone();
            request.tags = tags;
            async move { client.create_user_group(&request).await }
        })
        .await?;

        let group = waiters::user_group_available(
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

        let arn = group.arn.as_deref().or(created.arn.as_deref());
        tag_after_create(client, KIND, id, arn, &untagged, !input.tags.is_empty()).await?;

        Ok(group)
    }

    /// Read the normalized state of a user group
    ///
    /// A group being deleted reads as removed.
    pub async fn read(&self, id: &str, options: &ReadOptions) -> Result<ReadOutcome<UserGroupState>> {
        let group = match self.client.describe_user_group(id).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() && !options.is_new_resource => {
                warn!(id = %id, "user group not found, removing from state");
                return Ok(ReadOutcome::Removed);
            }
            Err(e) => return Err(CoreError::api(KIND, id, "reading", e)),
        };

        if !options.is_new_resource && group.classify() == UserGroupStatus::Deleting {
            warn!(id = %id, "user group is being deleted, removing from state");
            return Ok(ReadOutcome::Removed);
        }

        let mut state = UserGroupState::from(&group);
        if let Some(arn) = state.arn.as_deref() {
            state.tags = crate::tags::list_tags(&*self.client, KIND, id, arn).await?;
        }
        Ok(ReadOutcome::Found(state))
    }

    /// Apply membership and tag changes
    pub async fn update<D: ResourceDiff + ?Sized>(&self, id: &str, diff: &D) -> Result<()> {
        for op in plan_user_group(id, diff)? {
            let operation = op.name();
            match op {
                UserGroupOp::ModifyMembership(input) => {
                    info!(
                        id = %id,
                        added = input.user_ids_to_add.len(),
                        removed = input.user_ids_to_remove.len(),
                        "updating user group membership"
                    );
                    self.client
                        .modify_user_group(&input)
                        .await
                        .context(KIND, id, operation)?;
                }
            }

            waiters::user_group_available(
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
            let group = self
                .client
                .describe_user_group(id)
                .await
                .context(KIND, id, "reading")?;
            if let Some(arn) = group.arn.as_deref() {
                crate::tags::reconcile_tags(
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

    /// Delete a user group and wait until it is gone
    pub async fn delete(&self, id: &str) -> Result<()> {
        let client = &*self.client;

        info!(id = %id, "deleting user group");
        match client.delete_user_group(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(id = %id, "user group already gone");
                return Ok(());
            }
            Err(e) => return Err(CoreError::api(KIND, id, "deleting", e)),
        }

        waiters::user_group_deleted(
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
