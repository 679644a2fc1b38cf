//! Reconciler configuration errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load reconciler config from {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save reconciler config to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse reconciler config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize reconciler config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values that parse but contradict each other
    #[error("Invalid reconciler config: {0}")]
    Invalid(String),

    #[error("No home directory to place the reconciler config in")]
    NoConfigDir,
}

impl ConfigError {
    pub(crate) fn load(path: &std::path::Path, source: std::io::Error) -> Self {
        ConfigError::Load {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn save(path: &std::path::Path, source: std::io::Error) -> Self {
        ConfigError::Save {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
