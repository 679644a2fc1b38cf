//! Unified error handling for elasticache-core
//!
//! Remote client failures arrive as an already-classified [`ApiError`]. Waits
//! fail with a [`WaitError`]. Both are wrapped into [`CoreError`] together with
//! the resource kind, identifier and the operation that was attempted.
//!
//! # Example
//!
//! ```rust
//! use elasticache_core::{ApiError, CoreError, ResourceKind};
//!
//! let err = CoreError::api(
//!     ResourceKind::ReplicationGroup,
//!     "my-group",
//!     "deleting",
//!     ApiError::not_found("ReplicationGroupNotFoundFault", "gone"),
//! );
//! assert!(err.is_not_found());
//! assert!(err.to_string().contains("my-group"));
//! ```

use crate::config::ConfigError;
use crate::model::ResourceKind;
use std::time::Duration;
use thiserror::Error;

/// Classified error returned by the remote resource client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The resource does not exist remotely
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    /// The resource is in a state that blocks the request
    #[error("{code}: {message}")]
    InvalidState { code: String, message: String },

    /// The request was malformed or carried an invalid value
    #[error("{code}: {message}")]
    InvalidParameter { code: String, message: String },

    /// Rate limited or otherwise throttled
    #[error("{code}: {message}")]
    Throttled { code: String, message: String },

    /// The request did not complete in time
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// The partition does not support the operation (typically tagging)
    #[error("operation not supported in partition: {message}")]
    UnsupportedInPartition { message: String },

    #[error("{code}: {message}")]
    Unknown { code: String, message: String },
}

/// Whether an invalid-state error can clear on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidStateKind {
    /// Blocked by an in-progress operation (snapshotting, pending changes)
    Transient,
    /// A conflict no amount of retrying resolves
    Structural,
}

/// Remote messages that mark an invalid-state error as structural
const STRUCTURAL_STATE_MARKERS: &[&str] = &[
    "serving as primary",
    "only member of a replication group",
];

impl InvalidStateKind {
    /// Classify an invalid-state message
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if STRUCTURAL_STATE_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
        {
            InvalidStateKind::Structural
        } else {
            InvalidStateKind::Transient
        }
    }
}

impl ApiError {
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::InvalidState {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_parameter(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::InvalidParameter {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        ApiError::Throttled {
            code: "Throttling".to_string(),
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ApiError::Timeout {
            message: message.into(),
        }
    }

    pub fn unsupported_in_partition(message: impl Into<String>) -> Self {
        ApiError::UnsupportedInPartition {
            message: message.into(),
        }
    }

    pub fn unknown(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Unknown {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The remote error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::NotFound { message, .. }
            | ApiError::InvalidState { message, .. }
            | ApiError::InvalidParameter { message, .. }
            | ApiError::Throttled { message, .. }
            | ApiError::Timeout { message }
            | ApiError::UnsupportedInPartition { message }
            | ApiError::Unknown { message, .. } => message,
        }
    }

    /// Returns true if the message contains `needle`
    pub fn message_contains(&self, needle: &str) -> bool {
        self.message().contains(needle)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, ApiError::InvalidState { .. })
    }

    #[must_use]
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, ApiError::InvalidParameter { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    #[must_use]
    pub fn is_unsupported_in_partition(&self) -> bool {
        matches!(self, ApiError::UnsupportedInPartition { .. })
    }

    /// Classification of an invalid-state error, `None` for other errors
    pub fn invalid_state_kind(&self) -> Option<InvalidStateKind> {
        match self {
            ApiError::InvalidState { message, .. } => Some(InvalidStateKind::classify(message)),
            _ => None,
        }
    }

    /// Returns true if the same request may succeed later without changes
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Throttled { .. } | ApiError::Timeout { .. } => true,
            ApiError::InvalidState { .. } => {
                self.invalid_state_kind() == Some(InvalidStateKind::Transient)
            }
            _ => false,
        }
    }
}

/// Failure of a single poll-until-status wait
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaitError {
    /// The deadline passed without reaching a target status
    #[error(
        "timeout while waiting for state to become '{target}' (last state: '{last_status}', timeout: {timeout:?})"
    )]
    Timeout {
        target: String,
        last_status: String,
        timeout: Duration,
    },

    /// A status outside both the pending and target sets was observed
    #[error("unexpected state '{status}', wanted target '{target}'")]
    UnexpectedState { status: String, target: String },

    /// The resource stayed absent while a non-empty target was expected
    #[error("couldn't find resource (checked {checks} times)")]
    NotFound { checks: u32 },

    /// The status refresh call failed
    #[error(transparent)]
    Refresh(#[from] ApiError),
}

/// Core error type for reconcile operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// A remote call failed
    #[error("{operation} {kind} ({id}): {source}")]
    Api {
        kind: ResourceKind,
        id: String,
        operation: &'static str,
        source: ApiError,
    },

    /// A wait for a target status failed
    #[error("{operation} {kind} ({id}): {source}")]
    Wait {
        kind: ResourceKind,
        id: String,
        operation: &'static str,
        source: WaitError,
    },

    /// A resource created in this operation could no longer be found
    #[error("{kind} ({id}) not found after creation")]
    ResourceVanished { kind: ResourceKind, id: String },

    /// The change cannot be applied in place
    #[error("{kind} ({id}): changing {field} requires replacement")]
    ReplacementRequired {
        kind: ResourceKind,
        id: String,
        field: String,
    },

    /// Invalid combination of desired values
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn api(
        kind: ResourceKind,
        id: impl Into<String>,
        operation: &'static str,
        source: ApiError,
    ) -> Self {
        CoreError::Api {
            kind,
            id: id.into(),
            operation,
            source,
        }
    }

    pub fn wait(
        kind: ResourceKind,
        id: impl Into<String>,
        operation: &'static str,
        source: WaitError,
    ) -> Self {
        CoreError::Wait {
            kind,
            id: id.into(),
            operation,
            source,
        }
    }

    /// The remote error behind this error, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            CoreError::Api { source, .. } => Some(source),
            CoreError::Wait {
                source: WaitError::Refresh(source),
                ..
            } => Some(source),
            _ => None,
        }
    }

    /// Returns true if the resource was absent
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::Api { source, .. } => source.is_not_found(),
            CoreError::Wait { source, .. } => matches!(source, WaitError::NotFound { .. }),
            CoreError::ResourceVanished { .. } => true,
            _ => false,
        }
    }

    /// Returns true if a wait or request ran out of time
    ///
    /// Callers should treat the final remote state as unknown and re-read.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::Api { source, .. } => source.is_timeout(),
            CoreError::Wait { source, .. } => matches!(source, WaitError::Timeout { .. }),
            _ => false,
        }
    }

    /// Returns true if this is a caller/config problem rather than a remote one
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            CoreError::Validation(_) => true,
            CoreError::Api { source, .. } => source.is_invalid_parameter(),
            _ => false,
        }
    }

    /// Returns true if this error is potentially retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Api { source, .. } => source.is_retryable(),
            CoreError::Wait { source, .. } => match source {
                WaitError::Timeout { .. } => true,
                WaitError::Refresh(e) => e.is_retryable(),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Attach resource context to remote and wait failures
pub(crate) trait ResultExt<T> {
    fn context(self, kind: ResourceKind, id: &str, operation: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, ApiError> {
    fn context(self, kind: ResourceKind, id: &str, operation: &'static str) -> Result<T> {
        self.map_err(|e| CoreError::api(kind, id, operation, e))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, WaitError> {
    fn context(self, kind: ResourceKind, id: &str, operation: &'static str) -> Result<T> {
        self.map_err(|e| CoreError::wait(kind, id, operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_classification() {
        assert_eq!(
            InvalidStateKind::classify("Cache cluster foo-001 is serving as primary for replication group foo"),
            InvalidStateKind::Structural
        );
        assert_eq!(
            InvalidStateKind::classify(
                "Cannot delete cluster: it is the only member of a replication group"
            ),
            InvalidStateKind::Structural
        );
        assert_eq!(
            InvalidStateKind::classify("Cache cluster foo is not in a valid state to be deleted"),
            InvalidStateKind::Transient
        );
    }

    #[test]
    fn test_api_error_retryable() {
        assert!(ApiError::throttled("slow down").is_retryable());
        assert!(ApiError::timeout("no response").is_retryable());
        assert!(
            ApiError::invalid_state("InvalidReplicationGroupState", "snapshotting").is_retryable()
        );
        assert!(
            !ApiError::invalid_state("InvalidCacheClusterState", "is serving as primary")
                .is_retryable()
        );
        assert!(!ApiError::invalid_parameter("InvalidParameterValue", "bad").is_retryable());
        assert!(!ApiError::not_found("CacheClusterNotFound", "gone").is_retryable());
    }

    #[test]
    fn test_core_error_wraps_context() {
        let err = CoreError::api(
            ResourceKind::CacheCluster,
            "my-cluster",
            "modifying",
            ApiError::invalid_parameter("InvalidParameterValue", "bad node type"),
        );
        let msg = err.to_string();
        assert!(msg.contains("modifying"));
        assert!(msg.contains("ElastiCache Cache Cluster"));
        assert!(msg.contains("my-cluster"));
        assert!(msg.contains("bad node type"));
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_core_error_wait_timeout() {
        let err = CoreError::wait(
            ResourceKind::ReplicationGroup,
            "rg",
            "waiting for update of",
            WaitError::Timeout {
                target: "available".to_string(),
                last_status: "modifying".to_string(),
                timeout: Duration::from_secs(60),
            },
        );
        assert!(err.is_timeout());
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_core_error_validation() {
        let err = CoreError::Validation("node_type is required".to_string());
        assert!(err.is_validation());
        assert!(!err.is_retryable());
        assert!(err.api_error().is_none());
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), ApiError> =
            Err(ApiError::not_found("UserGroupNotFound", "missing"));
        let err = result
            .context(ResourceKind::UserGroup, "ug-1", "reading")
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.api_error().map(ApiError::is_not_found), Some(true));
    }
}
