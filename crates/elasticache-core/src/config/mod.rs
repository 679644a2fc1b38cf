//! Configuration for waits and retries
//!
// Allow nested config module - this is intentional for the config subsystem
#![allow(clippy::module_inception)]
//!
//! Every timeout, poll interval and retry ceiling used by the waiters and
//! workflows lives here and is passed in at call time. There is no
//! process-wide state.
//!
//! # Features
//!
//! - Per-resource-kind create/update/delete timeouts
//! - Poll interval and initial delays
//! - Retry backoff and ceilings for invalid-state retries
//! - TOML loading with environment variable expansion

pub mod config;
pub mod error;
pub mod resilience;
pub mod timeouts;

pub use config::ReconcilerConfig;
pub use error::{ConfigError, Result};
pub use resilience::RetrySettings;
pub use timeouts::{ResourceTimeouts, WaitSettings};
