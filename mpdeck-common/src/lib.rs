//! # Shared Records (backend output ↔ front-end)
//!
//! Defines the flat records produced from the VM backend's command-line output,
//! plus the pure transformations the front-end needs on top of them. Nothing in
//! this crate knows about terminals, threads or the backend process itself: it
//! only turns text into typed values.
//!
//! ## Key Types
//!
//! - [`VmSummary`] - One VM row, as shown in the main table
//! - [`SnapshotRecord`] - One snapshot of one instance
//! - [`MountRecord`] - One host directory mounted into a VM
//! - [`InfoBlock`] - Ordered `key: value` pairs for one VM
//! - [`SnapshotTree`] - Depth-first flattening of a snapshot forest
//!
//! ## Parsing Policy
//!
//! The backend's text output changes between versions. Parsers here are
//! deliberately tolerant: a line that doesn't look like a record is skipped,
//! never reported as an error. Only whole-document formats (JSON) can fail.

pub mod hierarchy;
pub mod parser;
pub mod records;

pub use hierarchy::{build_hierarchy, SnapshotTree, TreeEntry};
pub use parser::{
    merge_details, parse_info_blocks, parse_mounts_json, parse_size_bytes, parse_snapshot_list,
    parse_vm_list, ParseError,
};
pub use records::{InfoBlock, LifecycleState, MountRecord, SnapshotRecord, VmSummary};
