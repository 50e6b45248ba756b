//! Messages, commands and effects
//!
//! ```text
//!  key / tick / result ──▶ Message ──▶ App::update ──▶ Vec<Effect>
//!                                                        │
//!                       Dispatcher ◀── Effect::Dispatch(Command)
//!                           │
//!                           └── one thread per command ──▶ Message
//! ```
//!
//! Every background result arrives as a [`Message`] on the single inbound
//! channel. Failures travel in the same message as successes, as an error
//! string holding the backend's text verbatim.

use crossterm::event::KeyEvent;
use mpdeck_common::{InfoBlock, MountRecord, SnapshotRecord, VmSummary};

use crate::backend::{LaunchRequest, ResourceKey, ResourceSettings};
use crate::domain::{FetchOrigin, OpKind};
use crate::templates::Template;

// ============================================================================
// Operations
// ============================================================================

/// A state-changing backend operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Stop(String),
    Start(String),
    Suspend(String),
    Recover(String),
    Launch(LaunchRequest),
    Delete { vm: String, purge: bool },
    PurgeAll,
    SnapshotCreate { vm: String, name: String, comment: String },
    SnapshotRestore { vm: String, name: String },
    SnapshotDelete { vm: String, name: String },
    Mount { vm: String, source: String, target: String },
    Umount { vm: String, target: String },
    /// Unmount `old_target`, then mount `source` at `target`
    ModifyMount { vm: String, old_target: String, source: String, target: String },
    /// Applied in order; stops at the first failure
    SetResources { vm: String, changes: Vec<(ResourceKey, String)> },
}

impl Operation {
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Stop(_) => OpKind::Stop,
            Self::Start(_) => OpKind::Start,
            Self::Suspend(_) => OpKind::Suspend,
            Self::Recover(_) => OpKind::Recover,
            Self::Launch(_) => OpKind::Launch,
            Self::Delete { .. } => OpKind::Delete,
            Self::PurgeAll => OpKind::PurgeAll,
            Self::SnapshotCreate { .. } => OpKind::SnapshotCreate,
            Self::SnapshotRestore { .. } => OpKind::SnapshotRestore,
            Self::SnapshotDelete { .. } => OpKind::SnapshotDelete,
            Self::Mount { .. } => OpKind::Mount,
            Self::Umount { .. } => OpKind::Umount,
            Self::ModifyMount { .. } => OpKind::ModifyMount,
            Self::SetResources { .. } => OpKind::SetResources,
        }
    }

    /// The VM this operation targets. `None` only for fleet-wide operations.
    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::Stop(vm) | Self::Start(vm) | Self::Suspend(vm) | Self::Recover(vm) => Some(vm),
            Self::Launch(request) => Some(&request.name),
            Self::Delete { vm, .. }
            | Self::SnapshotCreate { vm, .. }
            | Self::SnapshotRestore { vm, .. }
            | Self::SnapshotDelete { vm, .. }
            | Self::Mount { vm, .. }
            | Self::Umount { vm, .. }
            | Self::ModifyMount { vm, .. }
            | Self::SetResources { vm, .. } => Some(vm),
            Self::PurgeAll => None,
        }
    }
}

/// Outcome of one [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpResult {
    pub entity: Option<String>,
    pub kind: OpKind,
    /// Backend error text; `None` on success
    pub error: Option<String>,
}

// ============================================================================
// Commands (coordinator → dispatcher)
// ============================================================================

/// Unit of background work. Each produces exactly one [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchVms { origin: FetchOrigin, seq: u64 },
    FetchInfo(String),
    FetchSnapshots(String),
    FetchMounts(String),
    FetchResources(String),
    FetchVersion,
    LoadTemplates,
    Run(Operation),
}

impl Command {
    /// Short name used for worker threads and log lines.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::FetchVms { origin, seq } => format!("fetch-vms-{origin:?}-{seq}"),
            Self::FetchInfo(vm) => format!("info-{vm}"),
            Self::FetchSnapshots(vm) => format!("snapshots-{vm}"),
            Self::FetchMounts(vm) => format!("mounts-{vm}"),
            Self::FetchResources(vm) => format!("resources-{vm}"),
            Self::FetchVersion => "version".to_string(),
            Self::LoadTemplates => "templates".to_string(),
            Self::Run(op) => match op.entity() {
                Some(vm) => format!("{}-{vm}", op.kind()),
                None => op.kind().to_string(),
            },
        }
    }

    /// The message this command produces when it fails with `error`
    /// before or instead of reaching the backend.
    #[must_use]
    pub fn into_failure(self, error: String) -> Message {
        match self {
            Self::FetchVms { origin, seq } => {
                Message::VmsFetched { origin, seq, result: Err(error) }
            }
            Self::FetchInfo(vm) => Message::InfoFetched { vm, result: Err(error) },
            Self::FetchSnapshots(vm) => Message::SnapshotsFetched { vm, result: Err(error) },
            Self::FetchMounts(vm) => Message::MountsFetched { vm, result: Err(error) },
            Self::FetchResources(vm) => Message::ResourcesFetched { vm, result: Err(error) },
            Self::FetchVersion => Message::VersionFetched(Err(error)),
            Self::LoadTemplates => Message::TemplatesLoaded(Vec::new()),
            Self::Run(op) => Message::OpFinished(OpResult {
                entity: op.entity().map(str::to_string),
                kind: op.kind(),
                error: Some(error),
            }),
        }
    }
}

// ============================================================================
// Messages (everything → coordinator)
// ============================================================================

/// Requests a view makes of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    BackToTable,
    Submit(Operation),
    /// Ask before submitting
    Confirm(Operation),
    SnapshotManage { vm: String },
    SnapshotCreate { vm: String },
    MountManage { vm: String },
    MountAdd { vm: String },
    MountModify { vm: String, mount: MountRecord },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Key(KeyEvent),
    /// Refresh timer fired
    Tick,
    VmsFetched { origin: FetchOrigin, seq: u64, result: Result<Vec<VmSummary>, String> },
    OpFinished(OpResult),
    InfoFetched { vm: String, result: Result<InfoBlock, String> },
    SnapshotsFetched { vm: String, result: Result<Vec<SnapshotRecord>, String> },
    MountsFetched { vm: String, result: Result<Vec<MountRecord>, String> },
    ResourcesFetched { vm: String, result: Result<ResourceSettings, String> },
    VersionFetched(Result<String, String>),
    TemplatesLoaded(Vec<Template>),
    /// Outcome of an [`Effect::Yank`]
    Yanked { vm: String, text: String, result: Result<(), String> },
    Request(Request),
}

/// Side effects requested by the coordinator, performed by the run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Dispatch(Command),
    /// Re-arm the single-shot refresh timer
    ArmRefresh,
    /// Copy `text` to the clipboard; answered with [`Message::Yanked`]
    Yank { vm: String, text: String },
    Quit,
}
