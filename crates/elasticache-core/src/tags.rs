//! Tag reconciliation
//!
//! Some partitions reject tagging entirely. Those failures are swallowed with
//! a warning when only default tags are involved, and surfaced when the
//! caller set tags explicitly.

use crate::client::TagApi;
use crate::error::{ApiError, CoreError, Result, ResultExt};
use crate::model::{ResourceKind, Tags};
use tracing::{debug, warn};

/// Keys to remove and entries to add or update, going from `old` to `new`
pub fn tag_delta(old: &Tags, new: &Tags) -> (Vec<String>, Tags) {
    let remove = old
        .keys()
        .filter(|k| !new.contains_key(*k))
        .cloned()
        .collect();
    let upsert = new
        .iter()
        .filter(|(k, v)| old.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    (remove, upsert)
}

/// Default tags overlaid with the resource's own tags
pub fn merge_tags(default_tags: &Tags, tags: &Tags) -> Tags {
    let mut all = default_tags.clone();
    all.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    all
}

/// Bring the tags on `arn` from `old` to `new`
pub async fn reconcile_tags<C: TagApi + ?Sized>(
    client: &C,
    kind: ResourceKind,
    id: &str,
    arn: &str,
    old: &Tags,
    new: &Tags,
    explicit_tags: bool,
) -> Result<()> {
    let (remove, upsert) = tag_delta(old, new);

    if !remove.is_empty() {
        debug!(id = %id, keys = ?remove, "removing tags");
        let result = client.remove_tags(arn, &remove).await;
        tolerate_unsupported(result, kind, id, explicit_tags)?;
    }

    if !upsert.is_empty() {
        debug!(id = %id, count = upsert.len(), "adding tags");
        let result = client.add_tags(arn, &upsert).await;
        tolerate_unsupported(result, kind, id, explicit_tags)?;
    }

    Ok(())
}

/// Current tags on `arn`, empty when the partition does not support tagging
pub async fn list_tags<C: TagApi + ?Sized>(
    client: &C,
    kind: ResourceKind,
    id: &str,
    arn: &str,
) -> Result<Tags> {
    match client.list_tags(arn).await {
        Err(e) if e.is_unsupported_in_partition() => {
            warn!(id = %id, error = %e, "unable to list tags for {kind}");
            Ok(Tags::new())
        }
        result => result.context(kind, id, "listing tags for"),
    }
}

pub(crate) fn tolerate_unsupported(
    result: std::result::Result<(), ApiError>,
    kind: ResourceKind,
    id: &str,
    explicit_tags: bool,
) -> Result<()> {
    match result {
        Err(e) if e.is_unsupported_in_partition() && !explicit_tags => {
            warn!(id = %id, error = %e, "failed tagging {kind}, continuing");
            Ok(())
        }
        Err(e) => Err(CoreError::api(kind, id, "tagging", e)),
        Ok(()) => Ok(()),
    }
}
