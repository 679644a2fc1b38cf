//! Parameter group update planning
//!
//! A parameter diff splits into resets (names no longer configured) and
//! modifications (new or changed values). Both are sent in batches of at most
//! [`MAX_PARAMETERS_PER_REQUEST`], resets first.

use super::PlannedOperation;
use crate::diff::{DiffExt, ResourceDiff};
use crate::error::Result;
use crate::model::Parameter;
use std::collections::BTreeSet;

/// The remote API rejects larger parameter batches
pub const MAX_PARAMETERS_PER_REQUEST: usize = 20;

pub mod fields {
    pub const PARAMETER: &str = "parameter";
    pub const FAMILY: &str = "family";
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterGroupOp {
    /// Reset the named parameters to their defaults
    Reset(Vec<String>),
    /// Set parameter values
    Modify(Vec<Parameter>),
}

impl PlannedOperation for ParameterGroupOp {
    fn name(&self) -> &'static str {
        match self {
            ParameterGroupOp::Reset(_) => "resetting parameters of",
            ParameterGroupOp::Modify(_) => "modifying parameters of",
        }
    }
}

/// Resets and modifications for going from `old` to `new`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterChanges {
    /// Configured before, absent now
    pub remove: Vec<Parameter>,
    /// Absent before, or present with a different value
    pub upsert: Vec<Parameter>,
}

/// Split a parameter diff; relative order within each side is preserved
pub fn partition_parameters(old: &[Parameter], new: &[Parameter]) -> ParameterChanges {
    let new_names: BTreeSet<&str> = new.iter().map(|p| p.name.as_str()).collect();
    let old_set: BTreeSet<&Parameter> = old.iter().collect();

    let remove = old
        .iter()
        .filter(|p| !new_names.contains(p.name.as_str()))
        .cloned()
        .collect();
    let upsert = new
        .iter()
        .filter(|p| !old_set.contains(p))
        .cloned()
        .collect();

    ParameterChanges { remove, upsert }
}

/// Plan parameter resets and modifications
pub fn plan_parameter_group<D: ResourceDiff + ?Sized>(diff: &D) -> Result<Vec<ParameterGroupOp>> {
    let Some(change) = diff.change(fields::PARAMETER) else {
        return Ok(vec![]);
    };
    let old: Vec<Parameter> = change.old_as()?.unwrap_or_default();
    let new: Vec<Parameter> = change.new_as()?.unwrap_or_default();

    Ok(plan_parameter_changes(&partition_parameters(&old, &new)))
}

pub(crate) fn plan_parameter_changes(changes: &ParameterChanges) -> Vec<ParameterGroupOp> {
    let resets = changes
        .remove
        .chunks(MAX_PARAMETERS_PER_REQUEST)
        .map(|batch| ParameterGroupOp::Reset(batch.iter().map(|p| p.name.clone()).collect()));
    let modifies = changes
        .upsert
        .chunks(MAX_PARAMETERS_PER_REQUEST)
        .map(|batch| ParameterGroupOp::Modify(batch.to_vec()));

    resets.chain(modifies).collect()
}
