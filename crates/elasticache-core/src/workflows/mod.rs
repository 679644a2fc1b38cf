//! Lifecycle orchestrators
//!
//! One reconciler per resource kind composes remote calls, status waits,
//! bounded retries and planned updates into create, read, update and delete.
//! Each method runs a single logical operation to completion (or failure)
//! before returning. Reconcilers hold no mutable state, so distinct resource
//! identifiers can be reconciled concurrently through the same reconciler.
//!
//! # Example
//!
//! ```rust,ignore
//! use elasticache_core::workflows::{ReconcileContext, ReplicationGroupReconciler};
//! use std::sync::Arc;
//!
//! let context = Arc::new(ReconcileContext::new(ReconcilerConfig::load()?));
//! let reconciler = ReplicationGroupReconciler::new(Arc::new(client), context);
//!
//! let input = CreateReplicationGroupInput::new("my-group", "cache for my app")
//!     .with_node_type("cache.r6g.large")
//!     .with_num_cache_clusters(2);
//! let group = reconciler.create(&input).await?;
//! ```

pub mod cache_cluster;
pub mod global_replication_group;
pub mod parameter_group;
pub mod replication_group;
pub mod user_group;
pub(crate) mod waiters;

pub use cache_cluster::{CacheClusterReconciler, CacheClusterState};
pub use global_replication_group::{GlobalReplicationGroupReconciler, GlobalReplicationGroupState};
pub use parameter_group::{ParameterGroupReconciler, ParameterGroupState};
pub use replication_group::{DeleteReplicationGroupOptions, ReplicationGroupReconciler, ReplicationGroupState};
pub use user_group::{UserGroupReconciler, UserGroupState};

use crate::client::{ApiResult, TagApi};
use crate::config::ReconcilerConfig;
use crate::error::{CoreError, Result, ResultExt};
use crate::model::{ResourceKind, Tags};
use crate::progress::{ProgressCallback, WaitSpec};
use crate::status::Status;
use crate::tags::tolerate_unsupported;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Result of reading a resource
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    /// Current normalized state
    Found(T),
    /// The resource no longer exists (or is being deleted) and should be
    /// dropped from the caller's state
    Removed,
}

impl<T> ReadOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            ReadOutcome::Found(state) => Some(state),
            ReadOutcome::Removed => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, ReadOutcome::Removed)
    }
}

/// Caller knowledge that shapes a read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Set when reading right after create; absence is then an error
    pub is_new_resource: bool,
    /// Engine version as the caller configured it, used to normalize the
    /// version read back
    pub configured_engine_version: Option<String>,
}

impl ReadOptions {
    pub fn new_resource() -> Self {
        Self {
            is_new_resource: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_engine_version(mut self, version: impl Into<String>) -> Self {
        self.configured_engine_version = Some(version.into());
        self
    }
}

/// Settings shared by every reconciler
pub struct ReconcileContext {
    pub config: ReconcilerConfig,
    /// Tags applied to every resource, overridden by the resource's own
    pub default_tags: Tags,
    on_progress: Option<ProgressCallback>,
}

impl ReconcileContext {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            default_tags: Tags::new(),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_default_tags(mut self, tags: Tags) -> Self {
        self.default_tags = tags;
        self
    }

    /// Receive an event for every status check of every wait
    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub(crate) fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }

    pub(crate) fn wait_spec<S: Status>(
        &self,
        pending: Vec<S>,
        target: Vec<S>,
        timeout: Duration,
        delay: Duration,
    ) -> WaitSpec<S> {
        WaitSpec::new(pending, target, timeout)
            .with_delay(delay)
            .with_min_interval(self.config.wait.min_poll_interval())
            .with_not_found_checks(self.config.wait.not_found_checks)
    }

    pub(crate) fn merged_tags(&self, tags: &Tags) -> Tags {
        crate::tags::merge_tags(&self.default_tags, tags)
    }
}

impl Default for ReconcileContext {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

impl std::fmt::Debug for ReconcileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileContext")
            .field("config", &self.config)
            .field("default_tags", &self.default_tags)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Map a not-found error to `None`
pub(crate) fn found<T>(result: ApiResult<T>) -> ApiResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Run a create call with `tags`, retrying once without them when the
/// partition rejects tagging on create
///
/// Returns the created resource and the tags still to be applied.
pub(crate) async fn create_with_tag_fallback<T, F, Fut>(
    kind: ResourceKind,
    id: &str,
    tags: &Tags,
    mut create: F,
) -> Result<(T, Tags)>
where
    F: FnMut(Tags) -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    match create(tags.clone()).await {
        Ok(created) => Ok((created, Tags::new())),
        Err(e) if e.is_unsupported_in_partition() && !tags.is_empty() => {
            warn!(id = %id, error = %e, "failed creating {kind} with tags, retrying without tags");
            let created = create(Tags::new()).await.context(kind, id, "creating")?;
            Ok((created, tags.clone()))
        }
        Err(e) => Err(CoreError::api(kind, id, "creating", e)),
    }
}

/// Apply tags that were dropped from the create call
pub(crate) async fn tag_after_create<C: TagApi + ?Sized>(
    client: &C,
    kind: ResourceKind,
    id: &str,
    arn: Option<&str>,
    tags: &Tags,
    explicit_tags: bool,
) -> Result<()> {
    if tags.is_empty() {
        return Ok(());
    }
    let Some(arn) = arn else {
        warn!(id = %id, "no ARN for {kind}, skipping tags");
        return Ok(());
    };
    let result = client.add_tags(arn, tags).await;
    tolerate_unsupported(result, kind, id, explicit_tags)
}
