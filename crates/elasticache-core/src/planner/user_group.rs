//! User group update planning

use super::PlannedOperation;
use crate::diff::{DiffExt, ResourceDiff, string_set_delta};
use crate::error::Result;
use crate::model::ModifyUserGroupInput;

pub mod fields {
    pub const USER_IDS: &str = "user_ids";
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserGroupOp {
    /// Additions and removals submitted together
    ModifyMembership(ModifyUserGroupInput),
}

impl PlannedOperation for UserGroupOp {
    fn name(&self) -> &'static str {
        "modifying"
    }
}

pub fn plan_user_group<D: ResourceDiff + ?Sized>(id: &str, diff: &D) -> Result<Vec<UserGroupOp>> {
    let Some(change) = diff.change(fields::USER_IDS) else {
        return Ok(vec![]);
    };
    let old: Vec<String> = change.old_as()?.unwrap_or_default();
    let new: Vec<String> = change.new_as()?.unwrap_or_default();
    let (add, remove) = string_set_delta(&old, &new);

    if add.is_empty() && remove.is_empty() {
        return Ok(vec![]);
    }

    Ok(vec![UserGroupOp::ModifyMembership(ModifyUserGroupInput {
        user_group_id: id.to_string(),
        user_ids_to_add: add,
        user_ids_to_remove: remove,
    })])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ConfigDiff;

    #[test]
    fn test_membership_delta_in_one_call() {
        let diff = ConfigDiff::new().with_change(
            fields::USER_IDS,
            vec!["default", "alice"],
            vec!["default", "bob", "carol"],
        );

        let ops = plan_user_group("ug", &diff).unwrap();

        assert_eq!(
            ops,
            vec![UserGroupOp::ModifyMembership(ModifyUserGroupInput {
                user_group_id: "ug".to_string(),
                user_ids_to_add: vec!["bob".to_string(), "carol".to_string()],
                user_ids_to_remove: vec!["alice".to_string()],
            })]
        );
    }

    #[test]
    fn test_reordered_members_emit_nothing() {
        let diff = ConfigDiff::new().with_change(fields::USER_IDS, vec!["a", "b"], vec!["b", "a"]);
        assert!(plan_user_group("ug", &diff).unwrap().is_empty());
    }
}
