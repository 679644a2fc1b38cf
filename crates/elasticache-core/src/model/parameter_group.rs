//! Parameter group snapshots and inputs

use super::Tags;
use serde::{Deserialize, Serialize};

/// A parameter name/value pair
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Describe-call view of a parameter group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheParameterGroup {
    pub name: String,
    pub family: String,
    pub description: Option<String>,
    pub arn: Option<String>,
    #[serde(default)]
    pub is_global: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCacheParameterGroupInput {
    pub name: String,
    /// e.g. "redis7" or "memcached1.6"
    pub family: String,
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub tags: Tags,
}

impl CreateCacheParameterGroupInput {
    #[must_use]
    pub fn new(name: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family: family.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(name, value));
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}
