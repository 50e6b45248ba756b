//! Flat record types decoded from backend output.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Lifecycle State
// ============================================================================

/// Lifecycle state of a VM as reported by the backend.
///
/// Anything the backend reports that isn't one of the four well-known states
/// (transitional states, states added by newer backend versions, garbage)
/// collapses into [`LifecycleState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    Running,
    Stopped,
    Suspended,
    /// Soft-deleted: still listed until purged, can be recovered
    Deleted,
    #[default]
    Unknown,
}

impl LifecycleState {
    /// Parse the backend's state label (case-insensitive).
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            "suspended" => Self::Suspended,
            "deleted" => Self::Deleted,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Suspended => "Suspended",
            Self::Deleted => "Deleted",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// VM Summary
// ============================================================================

/// One VM as shown in the main table.
///
/// The list output only carries name, state, addresses and image; the other
/// fields are filled in from the details output when it is available (see
/// [`crate::merge_details`]) and stay at their defaults otherwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VmSummary {
    /// Unique, user-chosen name. Immutable once created.
    pub name: String,
    pub state: LifecycleState,
    /// IPv4 addresses, primary first. Empty when the VM has none.
    pub ipv4: Vec<String>,
    /// OS release label, e.g. "Ubuntu 24.04 LTS"
    pub release: String,
    pub cpus: Option<u32>,
    /// Load average as printed by the backend ("0.00 0.01 0.05")
    pub load: String,
    pub disk_usage: String,
    pub memory_usage: String,
    pub mount_count: usize,
    pub snapshot_count: usize,
}

impl VmSummary {
    /// First IPv4 address, if any.
    #[must_use]
    pub fn primary_ipv4(&self) -> Option<&str> {
        self.ipv4.first().map(String::as_str)
    }
}

// ============================================================================
// Snapshots and Mounts
// ============================================================================

/// One snapshot of one instance.
///
/// Identity is the `(instance, name)` pair. `parent` and `comment` are empty
/// when the backend prints `--`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub instance: String,
    pub name: String,
    pub parent: String,
    pub comment: String,
}

impl SnapshotRecord {
    #[must_use]
    pub fn has_parent(&self) -> bool {
        !self.parent.is_empty()
    }
}

/// One host directory mounted into a VM.
///
/// Identity is `target` (the path inside the VM), unique per VM.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MountRecord {
    pub target: String,
    pub source: String,
    pub uid_mappings: Vec<String>,
    pub gid_mappings: Vec<String>,
}

// ============================================================================
// Info Blocks
// ============================================================================

/// Ordered `key: value` pairs describing one VM.
///
/// Keys keep the backend's spelling ("Disk usage", "CPU(s)"). Multi-line
/// values (the mount list) are joined with newlines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoBlock {
    pub fields: Vec<(String, String)>,
}

impl InfoBlock {
    /// Value of the first field named `key` (case-insensitive).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The `Name` field, which identifies the block.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get("Name")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_labels_roundtrip_case_insensitively() {
        assert_eq!(LifecycleState::from_label("RUNNING"), LifecycleState::Running);
        assert_eq!(LifecycleState::from_label("suspended"), LifecycleState::Suspended);
        assert_eq!(LifecycleState::from_label("Starting"), LifecycleState::Unknown);
        assert_eq!(LifecycleState::Deleted.to_string(), "Deleted");
    }

    #[test]
    fn test_info_block_lookup() {
        let block = InfoBlock {
            fields: vec![
                ("Name".to_string(), "vm1".to_string()),
                ("CPU(s)".to_string(), "2".to_string()),
            ],
        };
        assert_eq!(block.name(), Some("vm1"));
        assert_eq!(block.get("cpu(s)"), Some("2"));
        assert_eq!(block.get("Load"), None);
    }
}
