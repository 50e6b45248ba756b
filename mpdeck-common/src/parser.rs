//! Record parsing for backend command output.
//!
//! Three input shapes are handled:
//!
//! ```text
//! Tabular (list, list --snapshots)      Key:value blocks (info)     JSON (info --format json)
//! ───────────────────────────────       ──────────────────────      ─────────────────────────
//! Name   State    IPv4      Image       Name:     vm1               {"info": {"vm1": {
//! vm1    Running  10.0.0.5  Ubuntu …    State:    Running             "mounts": {...}}}}
//!                 10.1.0.2              CPU(s):   2
//! vm2    Stopped  --        Ubuntu …    Mounts:   /a => /b
//!                                                   UID map: …
//! ```
//!
//! Tabular and block parsers never fail: a line that doesn't fit is skipped
//! and logged at debug level. `--` always means "no value".

use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use thiserror::Error;

use crate::records::{InfoBlock, LifecycleState, MountRecord, SnapshotRecord, VmSummary};

/// Placeholder the backend prints for an absent value
const ABSENT: &str = "--";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Backend returned malformed JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

// =============================================================================
// HELPERS
// =============================================================================

/// Map the backend's `--` placeholder to an empty string.
fn present(value: &str) -> String {
    if value == ABSENT {
        String::new()
    } else {
        value.to_string()
    }
}

/// Split off the first `n` whitespace-separated tokens, returning them plus
/// the untouched remainder of the line (inner spacing preserved).
fn split_fields(line: &str, n: usize) -> Option<(Vec<&str>, &str)> {
    let mut fields = Vec::with_capacity(n);
    let mut rest = line.trim_start();
    for _ in 0..n {
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    Some((fields, rest.trim_end()))
}

/// Separator rows are made only of dashes, equals signs and spaces.
fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| matches!(c, '-' | '=' | '+' | ' '))
}

fn is_header(line: &str, first: &str, second: &str) -> bool {
    let mut tokens = line.split_whitespace();
    tokens.next().is_some_and(|t| t.eq_ignore_ascii_case(first))
        && tokens.next().is_some_and(|t| t.eq_ignore_ascii_case(second))
}

// =============================================================================
// VM LIST
// =============================================================================

/// Parse `list` output into VM summaries.
///
/// Rows before the `Name State …` header are ignored, so "No instances
/// found." yields an empty list. Indented rows holding only an IP address are
/// extra addresses of the VM above them.
#[must_use]
pub fn parse_vm_list(text: &str) -> Vec<VmSummary> {
    let mut vms: Vec<VmSummary> = Vec::new();
    let mut seen_header = false;

    for line in text.lines() {
        if line.trim().is_empty() || is_separator(line) {
            continue;
        }
        if is_header(line, "Name", "State") {
            seen_header = true;
            continue;
        }
        if !seen_header {
            debug!("vm list: skipping line before header: {line:?}");
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            let candidate = line.trim();
            if candidate.parse::<IpAddr>().is_ok() {
                if let Some(last) = vms.last_mut() {
                    last.ipv4.push(candidate.to_string());
                    continue;
                }
            }
            debug!("vm list: skipping indented line: {line:?}");
            continue;
        }

        match parse_vm_row(line) {
            Some(vm) => vms.push(vm),
            None => debug!("vm list: skipping malformed row: {line:?}"),
        }
    }

    vms
}

fn parse_vm_row(line: &str) -> Option<VmSummary> {
    let (head, _) = split_fields(line, 2)?;
    // "Delayed Shutdown" is the one state label with a space in it
    let (state, consumed) = if head[1].eq_ignore_ascii_case("Delayed") {
        let (fields, _) = split_fields(line, 3)?;
        if fields[2].eq_ignore_ascii_case("Shutdown") {
            (LifecycleState::Running, 3)
        } else {
            (LifecycleState::Unknown, 2)
        }
    } else {
        (LifecycleState::from_label(head[1]), 2)
    };

    let (fields, image) = split_fields(line, consumed + 1)?;
    if image.is_empty() {
        return None;
    }
    let address = fields[consumed];
    let ipv4 = if address.parse::<IpAddr>().is_ok() {
        vec![address.to_string()]
    } else {
        if address != ABSENT {
            debug!("vm list: ignoring non-address {address:?} for {}", fields[0]);
        }
        Vec::new()
    };

    Some(VmSummary {
        name: fields[0].to_string(),
        state,
        ipv4,
        release: present(image),
        ..VmSummary::default()
    })
}

// =============================================================================
// SNAPSHOT LIST
// =============================================================================

/// Parse `list --snapshots` output into snapshot records.
///
/// Columns: `Instance Snapshot Parent Comment`. The comment is everything
/// after the parent column, so it may contain spaces.
#[must_use]
pub fn parse_snapshot_list(text: &str) -> Vec<SnapshotRecord> {
    let mut records = Vec::new();
    let mut seen_header = false;

    for line in text.lines() {
        if line.trim().is_empty() || is_separator(line) {
            continue;
        }
        if is_header(line, "Instance", "Snapshot") {
            seen_header = true;
            continue;
        }
        if !seen_header {
            debug!("snapshot list: skipping line before header: {line:?}");
            continue;
        }

        let Some((fields, comment)) = split_fields(line, 3) else {
            debug!("snapshot list: skipping malformed row: {line:?}");
            continue;
        };

        records.push(SnapshotRecord {
            instance: fields[0].to_string(),
            name: fields[1].to_string(),
            parent: present(fields[2]),
            comment: present(comment),
        });
    }

    records
}

// =============================================================================
// INFO BLOCKS
// =============================================================================

/// Parse `info` output (one or many VMs) into key/value blocks.
///
/// A blank line or a new `Name:` key starts a new block. Indented lines
/// continue the previous value (the mount list spans several lines).
#[must_use]
pub fn parse_info_blocks(text: &str) -> Vec<InfoBlock> {
    let mut blocks = Vec::new();
    let mut current = InfoBlock::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            if let Some((_, value)) = current.fields.last_mut() {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line.trim());
            } else {
                debug!("info: skipping orphan continuation: {line:?}");
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            debug!("info: skipping line without key: {line:?}");
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("Name") && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        current.fields.push((key.to_string(), present(value.trim())));
    }

    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Fill the detail fields of `vms` from `info` blocks, matched by name.
///
/// VMs without a block keep their list-only data.
pub fn merge_details(vms: &mut [VmSummary], blocks: &[InfoBlock]) {
    let by_name: HashMap<&str, &InfoBlock> =
        blocks.iter().filter_map(|b| b.name().map(|n| (n, b))).collect();

    for vm in vms.iter_mut() {
        let Some(block) = by_name.get(vm.name.as_str()) else {
            continue;
        };

        vm.cpus = block.get("CPU(s)").and_then(|v| v.trim().parse().ok());
        vm.load = block.get("Load").unwrap_or_default().to_string();
        vm.disk_usage = block.get("Disk usage").unwrap_or_default().to_string();
        vm.memory_usage = block.get("Memory usage").unwrap_or_default().to_string();
        vm.mount_count =
            block.get("Mounts").map_or(0, |m| m.lines().filter(|l| l.contains("=>")).count());
        vm.snapshot_count =
            block.get("Snapshots").and_then(|v| v.trim().parse().ok()).unwrap_or(0);
        if vm.release.is_empty() {
            vm.release = block.get("Release").unwrap_or_default().to_string();
        }
    }
}

// =============================================================================
// MOUNTS (JSON)
// =============================================================================

#[derive(Deserialize)]
struct InfoDocument {
    #[serde(default)]
    info: BTreeMap<String, InstanceDocument>,
}

#[derive(Deserialize)]
struct InstanceDocument {
    #[serde(default)]
    mounts: BTreeMap<String, MountDocument>,
}

#[derive(Deserialize)]
struct MountDocument {
    #[serde(default)]
    source_path: String,
    #[serde(default)]
    uid_mappings: Vec<String>,
    #[serde(default)]
    gid_mappings: Vec<String>,
}

/// Extract the mounts of `vm` from `info <vm> --format json` output.
///
/// Missing sections yield an empty list; only unparseable JSON is an error.
///
/// # Errors
/// Returns [`ParseError::InvalidJson`] if `json` is not a valid document.
pub fn parse_mounts_json(vm: &str, json: &str) -> Result<Vec<MountRecord>, ParseError> {
    let document: InfoDocument = serde_json::from_str(json)?;

    let Some(instance) = document.info.get(vm) else {
        debug!("mounts: no info section for {vm}");
        return Ok(Vec::new());
    };

    Ok(instance
        .mounts
        .iter()
        .map(|(target, mount)| MountRecord {
            target: target.clone(),
            source: mount.source_path.clone(),
            uid_mappings: mount.uid_mappings.clone(),
            gid_mappings: mount.gid_mappings.clone(),
        })
        .collect())
}

// =============================================================================
// SIZES
// =============================================================================

/// Parse a size string such as `4.8GiB`, `512M`, `20G` or `1073741824`.
///
/// Units are binary regardless of spelling (`G`, `GB` and `GiB` are all 2^30),
/// matching how the backend reports and accepts sizes.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn parse_size_bytes(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        _ => return None,
    };

    if number < 0.0 || !number.is_finite() {
        return None;
    }
    Some((number * multiplier as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
Name                    State             IPv4             Image
primary                 Running           10.0.0.5         Ubuntu 22.04 LTS
                                          10.1.0.2
builder                 Stopped           --               Ubuntu 24.04 LTS
";

    #[test]
    fn test_parse_vm_list_with_continuation_address() {
        let vms = parse_vm_list(LIST);
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[0].name, "primary");
        assert_eq!(vms[0].state, LifecycleState::Running);
        assert_eq!(vms[0].ipv4, vec!["10.0.0.5", "10.1.0.2"]);
        assert_eq!(vms[0].release, "Ubuntu 22.04 LTS");
        assert_eq!(vms[1].state, LifecycleState::Stopped);
        assert!(vms[1].ipv4.is_empty());
    }

    #[test]
    fn test_header_only_yields_nothing() {
        assert!(parse_vm_list("Name State IPv4 Image\n").is_empty());
        assert!(parse_vm_list("No instances found.\n").is_empty());
        assert!(parse_vm_list("").is_empty());
    }

    #[test]
    fn test_malformed_line_between_rows_is_skipped() {
        let text = "Name State IPv4 Image\n\
                    vm1 Running 10.0.0.1 Ubuntu 24.04 LTS\n\
                    garbage\n\
                    vm2 Stopped -- Ubuntu 24.04 LTS\n";
        let vms = parse_vm_list(text);
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[0].name, "vm1");
        assert_eq!(vms[1].name, "vm2");
    }

    #[test]
    fn test_separator_rows_and_unknown_states() {
        let text = "Name State IPv4 Image\n\
                    ---- ----- ---- -----\n\
                    vm1 Starting -- Ubuntu\n\
                    vm2 Delayed Shutdown 10.0.0.9 Ubuntu 22.04 LTS\n\
                    vm3 Deleted -- Not Available\n";
        let vms = parse_vm_list(text);
        assert_eq!(vms.len(), 3);
        assert_eq!(vms[0].state, LifecycleState::Unknown);
        assert_eq!(vms[1].state, LifecycleState::Running);
        assert_eq!(vms[1].ipv4, vec!["10.0.0.9"]);
        assert_eq!(vms[1].release, "Ubuntu 22.04 LTS");
        assert_eq!(vms[2].state, LifecycleState::Deleted);
        assert_eq!(vms[2].release, "Not Available");
    }

    #[test]
    fn test_address_column_must_hold_an_address() {
        let text = "Name State IPv4 Image
                    vm1 Running garbage Ubuntu
                    vm2 Running UNKNOWN Ubuntu 24.04 LTS
                    vm3 Running fd42::1 Ubuntu 24.04 LTS
";
        let vms = parse_vm_list(text);
        assert_eq!(vms.len(), 3);
        assert!(vms[0].ipv4.is_empty());
        assert_eq!(vms[0].release, "Ubuntu");
        assert!(vms[1].ipv4.is_empty());
        assert_eq!(vms[1].release, "Ubuntu 24.04 LTS");
        assert_eq!(vms[2].ipv4, vec!["fd42::1"]);
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let text = "Name State IPv4 Image\nvm1 Running\nvm2 Running 10.0.0.2\n";
        assert!(parse_vm_list(text).is_empty());
    }

    #[test]
    fn test_parse_snapshot_list() {
        let text = "Instance Snapshot Parent Comment\nvm1 base -- --\nvm1 dev1 base devwork";
        let records = parse_snapshot_list(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "base");
        assert!(records[0].parent.is_empty());
        assert!(records[0].comment.is_empty());
        assert_eq!(records[1].parent, "base");
        assert_eq!(records[1].comment, "devwork");
    }

    #[test]
    fn test_snapshot_comment_keeps_spaces() {
        let text = "Instance  Snapshot  Parent  Comment\nvm1  s1  --  before  the upgrade\n";
        let records = parse_snapshot_list(text);
        assert_eq!(records[0].comment, "before  the upgrade");
    }

    #[test]
    fn test_no_snapshots_message_is_not_a_record() {
        assert!(parse_snapshot_list("No snapshots found.\n").is_empty());
    }

    const INFO: &str = "\
Name:           vm1
State:          Running
Snapshots:      2
IPv4:           10.0.0.5
Release:        Ubuntu 24.04 LTS
CPU(s):         2
Load:           0.00 0.01 0.05
Disk usage:     2.1GiB out of 4.8GiB
Memory usage:   310.2MiB out of 3.8GiB
Mounts:         /home/me/src => /mnt/src
                    UID map: 1000:default
                    GID map: 1000:default
                /home/me/data => /mnt/data

Name:           vm2
State:          Stopped
Snapshots:      0
IPv4:           --
Release:        --
CPU(s):         --
Mounts:         --
";

    #[test]
    fn test_parse_info_blocks() {
        let blocks = parse_info_blocks(INFO);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name(), Some("vm1"));
        assert_eq!(blocks[0].get("Load"), Some("0.00 0.01 0.05"));
        assert!(blocks[0].get("Mounts").unwrap().contains("UID map: 1000:default"));
        assert_eq!(blocks[1].get("IPv4"), Some(""));
    }

    #[test]
    fn test_blocks_split_on_name_without_blank_line() {
        let blocks = parse_info_blocks("Name: a\nState: Running\nName: b\nState: Stopped\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].get("State"), Some("Stopped"));
    }

    #[test]
    fn test_merge_details() {
        let mut vms = vec![
            VmSummary { name: "vm1".into(), ..VmSummary::default() },
            VmSummary { name: "vm2".into(), ..VmSummary::default() },
            VmSummary { name: "vm3".into(), ..VmSummary::default() },
        ];
        merge_details(&mut vms, &parse_info_blocks(INFO));

        assert_eq!(vms[0].cpus, Some(2));
        assert_eq!(vms[0].mount_count, 2);
        assert_eq!(vms[0].snapshot_count, 2);
        assert_eq!(vms[0].memory_usage, "310.2MiB out of 3.8GiB");
        assert_eq!(vms[0].release, "Ubuntu 24.04 LTS");
        assert_eq!(vms[1].cpus, None);
        assert_eq!(vms[1].mount_count, 0);
        assert_eq!(vms[2], VmSummary { name: "vm3".into(), ..VmSummary::default() });
    }

    #[test]
    fn test_parse_mounts_json() {
        let json = r#"{"errors": [], "info": {"vm1": {"mounts": {
            "/mnt/src": {"source_path": "/home/me/src",
                         "uid_mappings": ["1000:default"], "gid_mappings": ["1000:default"]}
        }}}}"#;
        let mounts = parse_mounts_json("vm1", json).unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].target, "/mnt/src");
        assert_eq!(mounts[0].source, "/home/me/src");
        assert_eq!(mounts[0].uid_mappings, vec!["1000:default"]);

        assert!(parse_mounts_json("other", json).unwrap().is_empty());
        assert!(parse_mounts_json("vm1", "{not json").is_err());
    }

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size_bytes("512M"), Some(512 << 20));
        assert_eq!(parse_size_bytes("1.5GiB"), Some(3 << 29));
        assert_eq!(parse_size_bytes("20GB"), Some(20 << 30));
        assert_eq!(parse_size_bytes("1024"), Some(1024));
        assert_eq!(parse_size_bytes("lots"), None);
        assert_eq!(parse_size_bytes("5X"), None);
    }
}
