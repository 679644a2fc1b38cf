//! Reconciler configuration
//!
//! Timeouts, poll intervals and retry ceilings are plain data passed into the
//! waiters and workflows at call time. They can be loaded from a TOML file with
//! environment variable expansion.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use super::resilience::RetrySettings;
use super::timeouts::{ResourceTimeouts, WaitSettings};
use crate::model::ResourceKind;

/// Upper bound for every configured timeout, delay and retry ceiling (one week)
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

fn check_duration(section: &str, field: &str, secs: u64) -> Result<()> {
    if secs > MAX_DURATION_SECS {
        return Err(ConfigError::Invalid(format!(
            "{section}.{field} ({secs}s) exceeds the maximum of {MAX_DURATION_SECS}s"
        )));
    }
    Ok(())
}

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReconcilerConfig {
    #[serde(default = "ResourceTimeouts::cache_cluster")]
    pub cache_cluster: ResourceTimeouts,
    #[serde(default = "ResourceTimeouts::replication_group")]
    pub replication_group: ResourceTimeouts,
    #[serde(default = "ResourceTimeouts::global_replication_group")]
    pub global_replication_group: ResourceTimeouts,
    #[serde(default = "ResourceTimeouts::user_group")]
    pub user_group: ResourceTimeouts,
    /// Poll interval, initial delays and not-found tolerance
    #[serde(default)]
    pub wait: WaitSettings,
    /// Backoff and ceilings for invalid-state retries
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            cache_cluster: ResourceTimeouts::cache_cluster(),
            replication_group: ResourceTimeouts::replication_group(),
            global_replication_group: ResourceTimeouts::global_replication_group(),
            user_group: ResourceTimeouts::user_group(),
            wait: WaitSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Timeouts for a resource kind
    ///
    /// Parameter groups have no asynchronous status; they share the user
    /// group timeouts for the few waits they need.
    pub fn timeouts(&self, kind: ResourceKind) -> &ResourceTimeouts {
        match kind {
            ResourceKind::CacheCluster => &self.cache_cluster,
            ResourceKind::ReplicationGroup => &self.replication_group,
            ResourceKind::GlobalReplicationGroup => &self.global_replication_group,
            ResourceKind::ParameterGroup | ResourceKind::UserGroup => &self.user_group,
        }
    }

    /// Check ranges and cross-field constraints
    ///
    /// Every duration is capped at [`MAX_DURATION_SECS`] so deadlines computed
    /// from it stay representable.
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("cache_cluster", &self.cache_cluster),
            ("replication_group", &self.replication_group),
            ("global_replication_group", &self.global_replication_group),
            ("user_group", &self.user_group),
        ];
        for (section, t) in timeouts {
            check_duration(section, "create_secs", t.create_secs)?;
            check_duration(section, "update_secs", t.update_secs)?;
            check_duration(section, "delete_secs", t.delete_secs)?;
        }

        let wait = &self.wait;
        check_duration("wait", "min_poll_interval_secs", wait.min_poll_interval_secs)?;
        check_duration("wait", "create_delay_secs", wait.create_delay_secs)?;
        check_duration("wait", "modify_delay_secs", wait.modify_delay_secs)?;
        check_duration("wait", "delete_delay_secs", wait.delete_delay_secs)?;

        let retry = &self.retry;
        check_duration("retry", "cache_cluster_delete_secs", retry.cache_cluster_delete_secs)?;
        check_duration(
            "retry",
            "replication_group_delete_secs",
            retry.replication_group_delete_secs,
        )?;
        check_duration(
            "retry",
            "global_replication_group_delete_secs",
            retry.global_replication_group_delete_secs,
        )?;
        check_duration("retry", "parameter_group_delete_secs", retry.parameter_group_delete_secs)?;
        check_duration("retry", "parameter_reset_secs", retry.parameter_reset_secs)?;
        check_duration("retry", "max_backoff_ms", retry.max_backoff_ms / 1000)?;

        if self.retry.initial_backoff_ms == 0 {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.max_backoff_ms ({}) must be at least retry.initial_backoff_ms ({})",
                self.retry.max_backoff_ms, self.retry.initial_backoff_ms
            )));
        }
        if self.wait.min_poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "wait.min_poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the defaults.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(ReconcilerConfig::default());
        }

        let content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::load(config_path, e))?;

        let expanded_content = Self::expand_env_vars(&content);

        let config: ReconcilerConfig = toml::from_str(&expanded_content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::save(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::save(config_path, e))?;

        Ok(())
    }

    /// Get the path to the configuration file
    ///
    /// On Linux: ~/.config/elasticache-reconciler/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "elasticache", "elasticache-reconciler")
            .ok_or(ConfigError::NoConfigDir)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}` references
    ///
    /// Unset variables without a default are left as-is.
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}
