//! Status classification for remote resource snapshots
//!
//! Each resource kind has its own closed set of statuses. Anything the remote
//! service reports outside that set is kept as [`Unknown`](ClusterStatus::Unknown)
//! rather than folded into a known status, so the poller treats it as
//! unexpected instead of mistaking it for success.

use crate::model::{
    CacheCluster, GlobalReplicationGroup, GlobalReplicationGroupMember, ReplicationGroup,
    UserGroup,
};
use std::fmt;

/// A resource-kind-specific status
pub trait Status: Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync {
    /// Parse a raw remote status, case-insensitively
    fn parse(raw: &str) -> Self;

    /// The lower-cased wire form
    fn as_str(&self) -> &str;
}

/// Maps a snapshot to its simplified status
///
/// Pure and deterministic: the same snapshot always yields the same status.
pub trait Classify {
    type Status: Status;

    fn classify(&self) -> Self::Status;
}

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $wire:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// A status not in the known set, lower-cased
            Unknown(String),
        }

        impl Status for $name {
            fn parse(raw: &str) -> Self {
                let raw = raw.trim().to_lowercase();
                match raw.as_str() {
                    $($wire => $name::$variant,)+
                    _ => $name::Unknown(raw),
                }
            }

            fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unknown(raw) => raw,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum! {
    /// Cache cluster status
    ClusterStatus {
        Available => "available",
        Creating => "creating",
        Deleted => "deleted",
        Deleting => "deleting",
        IncompatibleNetwork => "incompatible-network",
        Modifying => "modifying",
        RebootingClusterNodes => "rebooting cluster nodes",
        RestoreFailed => "restore-failed",
        Snapshotting => "snapshotting",
    }
}

status_enum! {
    /// Replication group status
    ReplicationGroupStatus {
        Available => "available",
        CreateFailed => "create-failed",
        Creating => "creating",
        Deleting => "deleting",
        Modifying => "modifying",
        Snapshotting => "snapshotting",
    }
}

status_enum! {
    /// Global replication group status
    GlobalReplicationGroupStatus {
        Available => "available",
        Creating => "creating",
        Modifying => "modifying",
        PrimaryOnly => "primary-only",
        Deleting => "deleting",
        Deleted => "deleted",
    }
}

status_enum! {
    /// Association status of a regional member within a global replication group
    GlobalMemberStatus {
        Associated => "associated",
        Associating => "associating",
        Disassociated => "disassociated",
        Disassociating => "disassociating",
    }
}

status_enum! {
    /// User group status
    UserGroupStatus {
        Creating => "creating",
        Active => "active",
        Modifying => "modifying",
        Deleting => "deleting",
    }
}

impl Classify for CacheCluster {
    type Status = ClusterStatus;

    fn classify(&self) -> ClusterStatus {
        ClusterStatus::parse(&self.status)
    }
}

impl Classify for ReplicationGroup {
    type Status = ReplicationGroupStatus;

    fn classify(&self) -> ReplicationGroupStatus {
        ReplicationGroupStatus::parse(&self.status)
    }
}

impl Classify for GlobalReplicationGroup {
    type Status = GlobalReplicationGroupStatus;

    fn classify(&self) -> GlobalReplicationGroupStatus {
        GlobalReplicationGroupStatus::parse(&self.status)
    }
}

impl Classify for GlobalReplicationGroupMember {
    type Status = GlobalMemberStatus;

    fn classify(&self) -> GlobalMemberStatus {
        GlobalMemberStatus::parse(self.status.as_deref().unwrap_or_default())
    }
}

impl Classify for UserGroup {
    type Status = UserGroupStatus;

    fn classify(&self) -> UserGroupStatus {
        UserGroupStatus::parse(&self.status)
    }
}

/// Aggregate status of a replication group's member clusters
///
/// `available` when every member is available, otherwise the status of the
/// first member that is not.
pub fn member_clusters_status(clusters: &[CacheCluster]) -> ClusterStatus {
    clusters
        .iter()
        .map(Classify::classify)
        .find(|status| *status != ClusterStatus::Available)
        .unwrap_or(ClusterStatus::Available)
}
