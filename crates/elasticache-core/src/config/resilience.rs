//! Retry configuration for blocked remote calls
//!
//! Invalid-state errors that indicate a transient blocking condition are
//! retried with bounded exponential backoff until a per-call ceiling.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff and ceilings for invalid-state retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Ceiling for retrying a cache cluster delete
    #[serde(default = "default_cluster_delete_secs")]
    pub cache_cluster_delete_secs: u64,

    /// Ceiling for retrying a replication group delete
    #[serde(default = "default_replication_group_delete_secs")]
    pub replication_group_delete_secs: u64,

    /// Ceiling for retrying a global replication group delete
    #[serde(default = "default_global_delete_secs")]
    pub global_replication_group_delete_secs: u64,

    /// Ceiling for retrying a parameter group delete
    #[serde(default = "default_parameter_group_delete_secs")]
    pub parameter_group_delete_secs: u64,

    /// Ceiling for retrying a parameter reset while the group has pending changes
    #[serde(default = "default_parameter_reset_secs")]
    pub parameter_reset_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            cache_cluster_delete_secs: default_cluster_delete_secs(),
            replication_group_delete_secs: default_replication_group_delete_secs(),
            global_replication_group_delete_secs: default_global_delete_secs(),
            parameter_group_delete_secs: default_parameter_group_delete_secs(),
            parameter_reset_secs: default_parameter_reset_secs(),
        }
    }
}

impl RetrySettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn cache_cluster_delete(&self) -> Duration {
        Duration::from_secs(self.cache_cluster_delete_secs)
    }

    pub fn replication_group_delete(&self) -> Duration {
        Duration::from_secs(self.replication_group_delete_secs)
    }

    pub fn global_replication_group_delete(&self) -> Duration {
        Duration::from_secs(self.global_replication_group_delete_secs)
    }

    pub fn parameter_group_delete(&self) -> Duration {
        Duration::from_secs(self.parameter_group_delete_secs)
    }

    pub fn parameter_reset(&self) -> Duration {
        Duration::from_secs(self.parameter_reset_secs)
    }
}

// Default value functions for serde
fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_cluster_delete_secs() -> u64 {
    600
}

fn default_replication_group_delete_secs() -> u64 {
    600
}

fn default_global_delete_secs() -> u64 {
    300
}

fn default_parameter_group_delete_secs() -> u64 {
    180
}

fn default_parameter_reset_secs() -> u64 {
    30
}
