//! Status waits per resource kind
//!
//! Pending and target sets for every wait the reconcilers perform.

use super::{ReconcileContext, found};
use crate::client::{CacheClusterApi, GlobalReplicationGroupApi, ReplicationGroupApi, UserGroupApi};
use crate::error::WaitError;
use crate::model::{
    CacheCluster, GlobalReplicationGroup, GlobalReplicationGroupMember, ReplicationGroup, UserGroup,
};
use crate::progress::wait_for_status;
use crate::status::{
    Classify, ClusterStatus, GlobalMemberStatus, GlobalReplicationGroupStatus,
    ReplicationGroupStatus, UserGroupStatus, member_clusters_status,
};
use std::time::Duration;

type WaitResult<T> = Result<Option<T>, WaitError>;

fn with_status<T: Classify>(snapshot: Option<T>) -> Option<(T, T::Status)> {
    snapshot.map(|s| {
        let status = s.classify();
        (s, status)
    })
}

pub(crate) async fn cache_cluster_available<C: CacheClusterApi + ?Sized>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<CacheCluster> {
    let spec = ctx.wait_spec(
        vec![
            ClusterStatus::Creating,
            ClusterStatus::Modifying,
            ClusterStatus::Snapshotting,
            ClusterStatus::RebootingClusterNodes,
        ],
        vec![ClusterStatus::Available],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        found(client.describe_cache_cluster(id).await).map(with_status)
    })
    .await
}

pub(crate) async fn cache_cluster_deleted<C: CacheClusterApi + ?Sized>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<CacheCluster> {
    let spec = ctx.wait_spec(
        vec![
            ClusterStatus::Creating,
            ClusterStatus::Available,
            ClusterStatus::Modifying,
            ClusterStatus::Deleting,
            ClusterStatus::IncompatibleNetwork,
            ClusterStatus::RestoreFailed,
            ClusterStatus::Snapshotting,
        ],
        vec![],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        found(client.describe_cache_cluster(id).await).map(with_status)
    })
    .await
}

pub(crate) async fn replication_group_available<C: ReplicationGroupApi + ?Sized>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<ReplicationGroup> {
    let spec = ctx.wait_spec(
        vec![
            ReplicationGroupStatus::Creating,
            ReplicationGroupStatus::Modifying,
            ReplicationGroupStatus::Snapshotting,
        ],
        vec![ReplicationGroupStatus::Available],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        found(client.describe_replication_group(id).await).map(with_status)
    })
    .await
}

pub(crate) async fn replication_group_deleted<C: ReplicationGroupApi + ?Sized>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<ReplicationGroup> {
    let spec = ctx.wait_spec(
        vec![
            ReplicationGroupStatus::Creating,
            ReplicationGroupStatus::Available,
            ReplicationGroupStatus::Deleting,
        ],
        vec![],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        found(client.describe_replication_group(id).await).map(with_status)
    })
    .await
}

/// Wait for every member cluster of a replication group to be available
pub(crate) async fn replication_group_member_clusters_available<C>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<Vec<CacheCluster>>
where
    C: ReplicationGroupApi + CacheClusterApi + ?Sized,
{
    let spec = ctx.wait_spec(
        vec![
            ClusterStatus::Creating,
            ClusterStatus::Deleting,
            ClusterStatus::Modifying,
            ClusterStatus::Snapshotting,
        ],
        vec![ClusterStatus::Available],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        let Some(group) = found(client.describe_replication_group(id).await)? else {
            return Ok(None);
        };
        let clusters = client.describe_cache_clusters(&group.member_clusters).await?;
        if clusters.is_empty() {
            return Ok(None);
        }
        let status = member_clusters_status(&clusters);
        Ok(Some((clusters, status)))
    })
    .await
}

pub(crate) async fn global_replication_group_available<C: GlobalReplicationGroupApi + ?Sized>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<GlobalReplicationGroup> {
    let spec = ctx.wait_spec(
        vec![
            GlobalReplicationGroupStatus::Creating,
            GlobalReplicationGroupStatus::Modifying,
        ],
        vec![
            GlobalReplicationGroupStatus::Available,
            GlobalReplicationGroupStatus::PrimaryOnly,
        ],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        found(client.describe_global_replication_group(id).await).map(with_status)
    })
    .await
}

pub(crate) async fn global_replication_group_deleted<C: GlobalReplicationGroupApi + ?Sized>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<GlobalReplicationGroup> {
    let spec = ctx.wait_spec(
        vec![
            GlobalReplicationGroupStatus::Available,
            GlobalReplicationGroupStatus::PrimaryOnly,
            GlobalReplicationGroupStatus::Modifying,
            GlobalReplicationGroupStatus::Deleting,
        ],
        vec![],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        found(client.describe_global_replication_group(id).await).map(with_status)
    })
    .await
}

/// Wait until `member_id` no longer appears in the global replication group
///
/// A vanished global replication group counts as detached.
pub(crate) async fn global_replication_group_member_detached<C>(
    client: &C,
    ctx: &ReconcileContext,
    global_id: &str,
    member_id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<GlobalReplicationGroupMember>
where
    C: GlobalReplicationGroupApi + ?Sized,
{
    let spec = ctx.wait_spec(
        vec![
            GlobalMemberStatus::Associated,
            GlobalMemberStatus::Disassociating,
        ],
        vec![],
        timeout,
        delay,
    );
    wait_for_status(member_id, &spec, ctx.progress(), || async move {
        let group = found(client.describe_global_replication_group(global_id).await)?;
        let member = group.and_then(|g| g.member(member_id).cloned());
        Ok(with_status(member))
    })
    .await
}

pub(crate) async fn user_group_available<C: UserGroupApi + ?Sized>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<UserGroup> {
    let spec = ctx.wait_spec(
        vec![UserGroupStatus::Creating, UserGroupStatus::Modifying],
        vec![UserGroupStatus::Active],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        found(client.describe_user_group(id).await).map(with_status)
    })
    .await
}

pub(crate) async fn user_group_deleted<C: UserGroupApi + ?Sized>(
    client: &C,
    ctx: &ReconcileContext,
    id: &str,
    timeout: Duration,
    delay: Duration,
) -> WaitResult<UserGroup> {
    let spec = ctx.wait_spec(
        vec![
            UserGroupStatus::Active,
            UserGroupStatus::Deleting,
            UserGroupStatus::Modifying,
        ],
        vec![],
        timeout,
        delay,
    );
    wait_for_status(id, &spec, ctx.progress(), || async move {
        found(client.describe_user_group(id).await).map(with_status)
    })
    .await
}
