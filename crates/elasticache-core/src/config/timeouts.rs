//! Wait timing configuration
//!
//! Durations are stored as whole seconds so they read naturally in TOML.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Create/update/delete deadlines for one resource kind
///
/// A TOML table overriding these must set all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTimeouts {
    pub create_secs: u64,
    pub update_secs: u64,
    pub delete_secs: u64,
}

impl ResourceTimeouts {
    pub const fn from_minutes(create: u64, update: u64, delete: u64) -> Self {
        Self {
            create_secs: create * 60,
            update_secs: update * 60,
            delete_secs: delete * 60,
        }
    }

    pub fn cache_cluster() -> Self {
        Self::from_minutes(40, 80, 40)
    }

    pub fn replication_group() -> Self {
        Self::from_minutes(60, 40, 45)
    }

    pub fn global_replication_group() -> Self {
        Self::from_minutes(60, 60, 20)
    }

    pub fn user_group() -> Self {
        Self::from_minutes(10, 10, 10)
    }

    pub fn create(&self) -> Duration {
        Duration::from_secs(self.create_secs)
    }

    pub fn update(&self) -> Duration {
        Duration::from_secs(self.update_secs)
    }

    pub fn delete(&self) -> Duration {
        Duration::from_secs(self.delete_secs)
    }
}

/// Poll cadence shared by every wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    /// Fixed interval between status checks
    #[serde(default = "default_min_poll_interval")]
    pub min_poll_interval_secs: u64,

    /// Delay before the first check after a create call
    #[serde(default = "default_delay")]
    pub create_delay_secs: u64,

    /// Delay before the first check after a modify call
    #[serde(default = "default_delay")]
    pub modify_delay_secs: u64,

    /// Delay before the first check after a delete call
    #[serde(default = "default_delay")]
    pub delete_delay_secs: u64,

    /// Consecutive not-found results tolerated while a target status is expected
    #[serde(default = "default_not_found_checks")]
    pub not_found_checks: u32,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            min_poll_interval_secs: default_min_poll_interval(),
            create_delay_secs: default_delay(),
            modify_delay_secs: default_delay(),
            delete_delay_secs: default_delay(),
            not_found_checks: default_not_found_checks(),
        }
    }
}

impl WaitSettings {
    pub fn min_poll_interval(&self) -> Duration {
        Duration::from_secs(self.min_poll_interval_secs)
    }

    pub fn create_delay(&self) -> Duration {
        Duration::from_secs(self.create_delay_secs)
    }

    pub fn modify_delay(&self) -> Duration {
        Duration::from_secs(self.modify_delay_secs)
    }

    pub fn delete_delay(&self) -> Duration {
        Duration::from_secs(self.delete_delay_secs)
    }
}

fn default_min_poll_interval() -> u64 {
    10
}

fn default_delay() -> u64 {
    30
}

fn default_not_found_checks() -> u32 {
    20
}
