//! VM backend seam
//!
//! Everything the front-end does to a VM goes through [`Backend`]. Calls are
//! blocking and return the backend's decoded output or a [`BackendError`]
//! carrying its error text verbatim. The coordinator never calls a backend
//! directly: calls run on dispatcher threads (see `app::dispatch`).
//!
//! [`MultipassCli`] is the production implementation; tests substitute a
//! scripted fake.

mod multipass;

pub use multipass::MultipassCli;

use crate::domain::BackendError;

/// Result alias for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Parameters for launching a new VM. `None` means "backend default".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchRequest {
    pub name: String,
    /// Image/release alias, e.g. "24.04". Empty for the backend default.
    pub release: String,
    pub cpus: Option<u32>,
    pub memory_mb: Option<u64>,
    pub disk_gb: Option<u64>,
    pub cloud_init: Option<std::path::PathBuf>,
    pub network: Option<String>,
}

/// Per-VM resource settings exposed through `get`/`set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKey {
    Cpus,
    Memory,
    Disk,
}

impl ResourceKey {
    pub const ALL: [Self; 3] = [Self::Cpus, Self::Memory, Self::Disk];

    /// Settings key for `vm`, e.g. `local.vm1.cpus`.
    #[must_use]
    pub fn key(self, vm: &str) -> String {
        let leaf = match self {
            Self::Cpus => "cpus",
            Self::Memory => "memory",
            Self::Disk => "disk",
        };
        format!("local.{vm}.{leaf}")
    }
}

/// Current resource settings of one VM, as the backend prints them
/// (`2`, `4.0GiB`, `20.0GiB`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceSettings {
    pub cpus: String,
    pub memory: String,
    pub disk: String,
}

impl ResourceSettings {
    #[must_use]
    pub fn value(&self, key: ResourceKey) -> &str {
        match key {
            ResourceKey::Cpus => &self.cpus,
            ResourceKey::Memory => &self.memory,
            ResourceKey::Disk => &self.disk,
        }
    }
}

/// Blocking command surface of the VM backend.
pub trait Backend: Send + Sync {
    /// Tabular list of all VMs.
    fn list_vms(&self) -> BackendResult<String>;
    /// `key: value` details for one VM.
    fn vm_info(&self, name: &str) -> BackendResult<String>;
    /// `key: value` details for every VM.
    fn vm_info_all(&self) -> BackendResult<String>;
    /// JSON details for one VM (used for its mounts).
    fn vm_info_json(&self, name: &str) -> BackendResult<String>;

    fn launch(&self, request: &LaunchRequest) -> BackendResult<()>;
    fn stop(&self, name: &str) -> BackendResult<()>;
    fn start(&self, name: &str) -> BackendResult<()>;
    fn suspend(&self, name: &str) -> BackendResult<()>;
    fn recover(&self, name: &str) -> BackendResult<()>;
    fn delete(&self, name: &str, purge: bool) -> BackendResult<()>;
    fn purge_all(&self) -> BackendResult<()>;

    /// Tabular list of every snapshot of every VM.
    fn list_snapshots(&self) -> BackendResult<String>;
    fn create_snapshot(&self, vm: &str, name: &str, comment: &str) -> BackendResult<()>;
    fn restore_snapshot(&self, vm: &str, name: &str) -> BackendResult<()>;
    fn delete_snapshot(&self, vm: &str, name: &str) -> BackendResult<()>;

    fn mount(&self, source: &str, vm: &str, target: &str) -> BackendResult<()>;
    fn umount(&self, vm: &str, target: &str) -> BackendResult<()>;

    fn get_config(&self, key: &str) -> BackendResult<String>;
    fn set_config(&self, key: &str, value: &str) -> BackendResult<()>;

    fn version(&self) -> BackendResult<String>;
}
