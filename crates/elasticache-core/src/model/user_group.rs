//! User group snapshots and inputs

use super::Tags;
use serde::{Deserialize, Serialize};

/// Describe-call view of a user group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserGroup {
    pub user_group_id: String,
    pub arn: Option<String>,
    pub status: String,
    pub engine: Option<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub replication_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateUserGroupInput {
    pub user_group_id: String,
    pub engine: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl CreateUserGroupInput {
    #[must_use]
    pub fn new(user_group_id: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            user_group_id: user_group_id.into(),
            engine: engine.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_user_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Membership change submitted as two explicit id lists in one call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyUserGroupInput {
    pub user_group_id: String,
    #[serde(default)]
    pub user_ids_to_add: Vec<String>,
    #[serde(default)]
    pub user_ids_to_remove: Vec<String>,
}
