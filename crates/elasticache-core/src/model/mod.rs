//! Remote resource snapshots and request inputs
//!
//! Snapshots are point-in-time views returned by describe calls. They are never
//! mutated; a reconcile cycle replaces them with fresher snapshots. Inputs are
//! the request shapes handed to the remote client.

pub mod cache_cluster;
pub mod global_replication_group;
pub mod parameter_group;
pub mod replication_group;
pub mod user_group;

pub use cache_cluster::*;
pub use global_replication_group::*;
pub use parameter_group::*;
pub use replication_group::*;
pub use user_group::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource tags keyed by tag name
pub type Tags = BTreeMap<String, String>;

/// The kinds of remote resource this crate reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    CacheCluster,
    ReplicationGroup,
    GlobalReplicationGroup,
    ParameterGroup,
    UserGroup,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::CacheCluster => write!(f, "ElastiCache Cache Cluster"),
            ResourceKind::ReplicationGroup => write!(f, "ElastiCache Replication Group"),
            ResourceKind::GlobalReplicationGroup => {
                write!(f, "ElastiCache Global Replication Group")
            }
            ResourceKind::ParameterGroup => write!(f, "ElastiCache Parameter Group"),
            ResourceKind::UserGroup => write!(f, "ElastiCache User Group"),
        }
    }
}

/// A host/port pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: i32,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: i32) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// A configured log delivery destination, keyed by `log_type`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogDeliveryConfiguration {
    /// "slow-log" or "engine-log"
    pub log_type: String,
    /// "cloudwatch-logs" or "kinesis-firehose"
    pub destination_type: String,
    /// Log group or delivery stream name
    pub destination: String,
    /// "text" or "json"
    pub log_format: String,
}

/// Log delivery entry as submitted in a modify request
///
/// The remote API has no implicit removal for this field, so a log type that
/// is no longer configured is submitted with `enabled = false` and no
/// destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDeliveryConfigurationRequest {
    pub log_type: String,
    pub enabled: bool,
    pub destination_type: Option<String>,
    pub destination: Option<String>,
    pub log_format: Option<String>,
}

impl LogDeliveryConfigurationRequest {
    /// Request that enables (or updates) delivery for a configured entry
    pub fn enable(config: &LogDeliveryConfiguration) -> Self {
        Self {
            log_type: config.log_type.clone(),
            enabled: true,
            destination_type: Some(config.destination_type.clone()),
            destination: Some(config.destination.clone()),
            log_format: Some(config.log_format.clone()),
        }
    }

    /// Request that disables delivery for a log type
    pub fn disable(log_type: impl Into<String>) -> Self {
        Self {
            log_type: log_type.into(),
            enabled: false,
            destination_type: None,
            destination: None,
            log_format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        let endpoint = Endpoint::new("cluster.abc.cache.amazonaws.com", 6379);
        assert_eq!(endpoint.to_string(), "cluster.abc.cache.amazonaws.com:6379");
    }

    #[test]
    fn test_resource_kind_display() {
        assert_eq!(
            ResourceKind::ReplicationGroup.to_string(),
            "ElastiCache Replication Group"
        );
    }

    #[test]
    fn test_log_delivery_disable_has_no_destination() {
        let request = LogDeliveryConfigurationRequest::disable("slow-log");
        assert!(!request.enabled);
        assert!(request.destination.is_none());
    }
}
