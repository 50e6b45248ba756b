//! Operation kinds and fetch tags
//!
//! Every state-changing action maps to exactly one [`OpKind`]. The kind
//! decides whether the action runs inline on the table or navigates through
//! a dedicated view, and which busy descriptor (if any) marks its VM.

use std::fmt;

/// Kind of a state-changing backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Stop,
    Start,
    Suspend,
    Recover,
    Launch,
    Delete,
    PurgeAll,
    SnapshotCreate,
    SnapshotRestore,
    SnapshotDelete,
    Mount,
    Umount,
    /// Unmount the old target, then mount the new source/target
    ModifyMount,
    SetResources,
}

impl OpKind {
    /// Inline operations keep the user on the table while they run.
    #[must_use]
    pub fn is_inline(self) -> bool {
        matches!(self, Self::Stop | Self::Start | Self::Suspend | Self::Recover)
    }

    /// Busy descriptor recorded against the target VM while this runs.
    #[must_use]
    pub fn busy_kind(self) -> Option<BusyKind> {
        match self {
            Self::Stop => Some(BusyKind::Stopping),
            Self::Start => Some(BusyKind::Starting),
            Self::Suspend => Some(BusyKind::Suspending),
            Self::Recover => Some(BusyKind::Recovering),
            Self::Launch => Some(BusyKind::Creating),
            Self::Delete => Some(BusyKind::Deleting),
            Self::Mount | Self::ModifyMount => Some(BusyKind::Mounting),
            Self::Umount => Some(BusyKind::Unmounting),
            Self::PurgeAll
            | Self::SnapshotCreate
            | Self::SnapshotRestore
            | Self::SnapshotDelete
            | Self::SetResources => None,
        }
    }

    /// Past-tense description used in success notices.
    #[must_use]
    pub fn done_label(self) -> &'static str {
        match self {
            Self::Stop => "stopped",
            Self::Start => "started",
            Self::Suspend => "suspended",
            Self::Recover => "recovered",
            Self::Launch => "launched",
            Self::Delete => "deleted",
            Self::PurgeAll => "purged deleted instances",
            Self::SnapshotCreate => "snapshot created",
            Self::SnapshotRestore => "snapshot restored",
            Self::SnapshotDelete => "snapshot deleted",
            Self::Mount => "mounted",
            Self::Umount => "unmounted",
            Self::ModifyMount => "mount updated",
            Self::SetResources => "resources updated",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stop => "Stop",
            Self::Start => "Start",
            Self::Suspend => "Suspend",
            Self::Recover => "Recover",
            Self::Launch => "Launch",
            Self::Delete => "Delete",
            Self::PurgeAll => "Purge",
            Self::SnapshotCreate => "Snapshot",
            Self::SnapshotRestore => "Restore",
            Self::SnapshotDelete => "Delete snapshot",
            Self::Mount => "Mount",
            Self::Umount => "Unmount",
            Self::ModifyMount => "Modify mount",
            Self::SetResources => "Resize",
        };
        f.write_str(name)
    }
}

/// In-flight operation kind shown against a busy VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusyKind {
    Stopping,
    Starting,
    Suspending,
    Recovering,
    Creating,
    Deleting,
    Mounting,
    Unmounting,
}

impl BusyKind {
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Stopping => "Stopping",
            Self::Starting => "Starting",
            Self::Suspending => "Suspending",
            Self::Recovering => "Recovering",
            Self::Creating => "Creating",
            Self::Deleting => "Deleting",
            Self::Mounting => "Mounting",
            Self::Unmounting => "Unmounting",
        }
    }
}

impl fmt::Display for BusyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Who asked for a VM-list fetch.
///
/// Background fetches come from the refresh timer and must never move the
/// user to another view. Foreground fetches are user-triggered (or follow an
/// operation) and may complete a pending loading view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    Background,
    Foreground,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_kinds_all_mark_busy() {
        for kind in [OpKind::Stop, OpKind::Start, OpKind::Suspend, OpKind::Recover] {
            assert!(kind.is_inline());
            assert!(kind.busy_kind().is_some());
        }
        assert!(!OpKind::Launch.is_inline());
        assert_eq!(OpKind::ModifyMount.busy_kind(), Some(BusyKind::Mounting));
        assert_eq!(OpKind::SnapshotCreate.busy_kind(), None);
    }
}
