//! Engine version comparison and normalization
//!
//! Versions are `major.minor[.patch]` or `major.x`. A wildcard minor compares
//! as the highest possible minor, so `6.x` is greater than any explicit `6.y`.

use crate::diff::ResourceDiff;
use crate::error::{CoreError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Field name of the engine version in resource diffs
pub const ENGINE_VERSION_FIELD: &str = "engine_version";

/// A parsed engine version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineVersion {
    pub major: u32,
    /// `u32::MAX` for a wildcard minor
    pub minor: u32,
    pub patch: Option<u32>,
}

impl EngineVersion {
    /// Returns true if the minor version is the `x` wildcard
    pub fn is_wildcard(&self) -> bool {
        self.minor == u32::MAX
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch.unwrap_or(0))
    }
}

impl PartialOrd for EngineVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EngineVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl FromStr for EngineVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::Validation(format!("invalid engine version {s:?}"));

        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;

        let minor = match parts.next() {
            Some("x") => u32::MAX,
            Some(p) => p.parse::<u32>().map_err(|_| invalid())?,
            None => return Err(invalid()),
        };

        let patch = match parts.next() {
            Some(_) if minor == u32::MAX => return Err(invalid()),
            Some(p) => Some(p.parse::<u32>().map_err(|_| invalid())?),
            None => None,
        };

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            return write!(f, "{}.x", self.major);
        }
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        Ok(())
    }
}

/// Compare two version strings
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    let a: EngineVersion = a.parse()?;
    let b: EngineVersion = b.parse()?;
    Ok(a.cmp(&b))
}

/// Mark the engine version for replacement when the diff is a downgrade
///
/// Does nothing for a new resource, when either side is unset, or when the
/// diff reports a change but old and new are equal. Returns whether
/// replacement was requested.
pub fn force_replacement_on_downgrade<D: ResourceDiff + ?Sized>(diff: &mut D) -> Result<bool> {
    if diff.is_new_resource() || !diff.changed(ENGINE_VERSION_FIELD) {
        return Ok(false);
    }

    let (old, new) = diff.values(ENGINE_VERSION_FIELD);
    let (Some(old), Some(new)) = (old.as_str(), new.as_str()) else {
        return Ok(false);
    };
    if old.is_empty() || new.is_empty() || old == new {
        return Ok(false);
    }

    if compare(new, old)? == Ordering::Less {
        diff.force_replacement(ENGINE_VERSION_FIELD);
        return Ok(true);
    }
    Ok(false)
}

/// Read-back of an engine version: (configured form, actual version)
///
/// A configured `N.x` (major 6 or later) reads back as `<actual major>.x` so a
/// wildcard configuration stays stable across minor upgrades. Otherwise an
/// actual major below 6 reads back in full and later majors as `major.minor`.
pub fn normalize_engine_version(configured: Option<&str>, actual: &str) -> Result<(String, String)> {
    let actual_version: EngineVersion = actual.parse()?;

    if let Some(configured) = configured {
        if let Ok(v) = configured.parse::<EngineVersion>() {
            if v.is_wildcard() && v.major >= 6 {
                return Ok((format!("{}.x", actual_version.major), actual.to_string()));
            }
        }
    }

    let engine_version = if actual_version.major < 6 {
        actual.to_string()
    } else {
        format!("{}.{}", actual_version.major, actual_version.minor)
    };

    Ok((engine_version, actual.to_string()))
}
