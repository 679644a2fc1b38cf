//! # elasticache-core
//!
//! Reconciliation core for Amazon ElastiCache resources: cache clusters,
//! replication groups, global replication groups, parameter groups and user
//! groups.
//!
//! The crate drives a resource from its current remote state to a desired
//! configuration. It does not talk to the network; callers provide a client
//! implementing the traits in [`client`], and the core decides which calls to
//! make, in which order, and how long to wait between them.
//!
//! ## Layers
//!
//! - **[`status`]** - classify raw status strings into typed states
//! - **[`progress`]** - poll a resource until it reaches a target status
//! - **[`diff`] / [`planner`]** - turn a field-level diff into an ordered list
//!   of remote operations
//! - **[`workflows`]** - per-resource create, read, update and delete
//!
//! Timeouts, poll intervals and retry ceilings live in [`ReconcilerConfig`],
//! which can be loaded from a TOML file.
//!
//! ## Example
//!
//! ```rust,ignore
//! use elasticache_core::{ReconcileContext, ReconcilerConfig, UserGroupReconciler};
//! use elasticache_core::model::CreateUserGroupInput;
//! use std::sync::Arc;
//!
//! let context = ReconcileContext::new(ReconcilerConfig::load()?)
//!     .with_progress(Box::new(|event| println!("{event:?}")));
//! let reconciler = UserGroupReconciler::new(Arc::new(client), Arc::new(context));
//!
//! let input = CreateUserGroupInput::new("app-users", "redis").with_user_ids(["default", "app"]);
//! reconciler.create(&input).await?;
//! ```

pub mod client;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod planner;
pub mod progress;
pub mod retry;
pub mod status;
pub mod tags;
pub mod version;
pub mod workflows;

pub use config::{ReconcilerConfig, ResourceTimeouts, RetrySettings, WaitSettings};
pub use diff::{ConfigDiff, DiffExt, ResourceDiff};
pub use error::{ApiError, CoreError, Result, WaitError};
pub use model::{ResourceKind, Tags};
pub use progress::{ProgressCallback, ProgressEvent, WaitSpec, wait_for_status};
pub use workflows::{
    CacheClusterReconciler, GlobalReplicationGroupReconciler, ParameterGroupReconciler,
    ReadOptions, ReadOutcome, ReconcileContext, ReplicationGroupReconciler, UserGroupReconciler,
};
