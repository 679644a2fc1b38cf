//! Diff-driven update planning
//!
//! Each resource kind turns a [`ResourceDiff`](crate::diff::ResourceDiff) into
//! an ordered list of operations. Planners are pure: they never call the
//! remote service, and a field whose old and new values are equal never
//! produces an operation.
//!
//! The ordering rules encode constraints of the remote API:
//!
//! - shard-count and replica-count changes are distinct calls
//! - shard and replica changes run before the general modify call
//! - global replication groups accept one property change per request
//! - parameter batches hold at most [`MAX_PARAMETERS_PER_REQUEST`] entries

pub mod cache_cluster;
pub mod global_replication_group;
pub mod log_delivery;
pub mod parameter_group;
pub mod replication_group;
pub mod user_group;

pub use cache_cluster::{CacheClusterOp, plan_cache_cluster};
pub use global_replication_group::{GlobalReplicationGroupOp, plan_global_replication_group};
pub use log_delivery::log_delivery_requests;
pub use parameter_group::{
    MAX_PARAMETERS_PER_REQUEST, ParameterChanges, ParameterGroupOp, partition_parameters,
    plan_parameter_group,
};
pub use replication_group::{ReplicationGroupOp, plan_replication_group};
pub use user_group::{UserGroupOp, plan_user_group};

/// Field holding the apply-immediately flag in resource diffs
pub const APPLY_IMMEDIATELY_FIELD: &str = "apply_immediately";

/// Field holding the resource's own tags in resource diffs
pub const TAGS_FIELD: &str = "tags";

/// An operation produced by a planner
pub trait PlannedOperation {
    /// Short name used in logs and error context
    fn name(&self) -> &'static str;
}

/// Zero-padded identifiers removed when shrinking from `old` to `new`
///
/// Identifiers are 1-indexed and 4 digits wide. The highest-numbered ones
/// go first: shrinking 5 to 3 yields `["0005", "0004"]`.
pub fn ids_to_remove(old: i32, new: i32) -> Vec<String> {
    let floor = new.max(0);
    (floor + 1..=old).rev().map(|i| format!("{i:04}")).collect()
}
