//! Snapshot hierarchy reconstruction.
//!
//! The backend reports snapshots as a flat list where each record names its
//! parent. The manager view needs them as a tree:
//!
//! ```text
//! base
//! ├─ dev1
//! │  └─ dev1-fix
//! └─ release
//! orphan            <- parent "gone" doesn't resolve: promoted to root
//! ```
//!
//! The tree is always rebuilt from the full list; there is no incremental
//! update path.

use std::collections::HashMap;

use crate::records::SnapshotRecord;

/// One row of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub record: SnapshotRecord,
    /// Number of resolved ancestors (roots are 0)
    pub depth: usize,
    /// Box-drawing guide to print before the name ("", "├─ ", "│  └─ ", ...)
    pub prefix: String,
}

/// Depth-first, pre-order flattening of a snapshot forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotTree {
    entries: Vec<TreeEntry>,
}

impl SnapshotTree {
    #[must_use]
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TreeEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the snapshot forest for `records`.
///
/// - A parent resolves only to a snapshot of the *same* instance.
/// - Empty, dangling and self-referencing parents make the record a root.
/// - Siblings keep their input order.
/// - Records caught in a parent cycle are unreachable from any root; the
///   first of them (in input order) is promoted to a root so that every record
///   appears exactly once.
#[must_use]
pub fn build_hierarchy(records: &[SnapshotRecord]) -> SnapshotTree {
    let mut index: HashMap<(&str, &str), usize> = HashMap::with_capacity(records.len());
    for (i, r) in records.iter().enumerate() {
        index.entry((r.instance.as_str(), r.name.as_str())).or_insert(i);
    }

    let parent_of: Vec<Option<usize>> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if !r.has_parent() {
                return None;
            }
            index.get(&(r.instance.as_str(), r.parent.as_str())).copied().filter(|&p| p != i)
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    for (i, parent) in parent_of.iter().enumerate() {
        if let Some(p) = parent {
            children[*p].push(i);
        }
    }

    let mut visited = vec![false; records.len()];
    let mut entries = Vec::with_capacity(records.len());

    let roots: Vec<usize> = (0..records.len()).filter(|&i| parent_of[i].is_none()).collect();
    for &root in &roots {
        walk(root, records, &children, &mut visited, &mut entries);
    }

    // Anything left is part of a cycle
    for i in 0..records.len() {
        if !visited[i] {
            walk(i, records, &children, &mut visited, &mut entries);
        }
    }

    SnapshotTree { entries }
}

/// Pre-order walk from `root`, emitting entries with their guide prefixes.
fn walk(
    root: usize,
    records: &[SnapshotRecord],
    children: &[Vec<usize>],
    visited: &mut [bool],
    entries: &mut Vec<TreeEntry>,
) {
    // (node, depth, guide columns inherited from ancestors, is last sibling)
    let mut stack: Vec<(usize, usize, String, bool)> = vec![(root, 0, String::new(), true)];

    while let Some((node, depth, guides, is_last)) = stack.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;

        let prefix = if depth == 0 {
            String::new()
        } else {
            format!("{guides}{}", if is_last { "└─ " } else { "├─ " })
        };
        let child_guides = if depth == 0 {
            String::new()
        } else {
            format!("{guides}{}", if is_last { "   " } else { "│  " })
        };

        let pending: Vec<usize> = children[node].iter().copied().filter(|&c| !visited[c]).collect();
        for (pos, &child) in pending.iter().enumerate().rev() {
            stack.push((child, depth + 1, child_guides.clone(), pos + 1 == pending.len()));
        }

        entries.push(TreeEntry { record: records[node].clone(), depth, prefix });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_snapshot_list;

    fn snap(instance: &str, name: &str, parent: &str) -> SnapshotRecord {
        SnapshotRecord {
            instance: instance.to_string(),
            name: name.to_string(),
            parent: parent.to_string(),
            comment: String::new(),
        }
    }

    fn names(tree: &SnapshotTree) -> Vec<&str> {
        tree.entries().iter().map(|e| e.record.name.as_str()).collect()
    }

    fn depths(tree: &SnapshotTree) -> Vec<usize> {
        tree.entries().iter().map(|e| e.depth).collect()
    }

    #[test]
    fn test_parent_resolves_from_listing() {
        let records = parse_snapshot_list(
            "Instance Snapshot Parent Comment\nvm1 base -- --\nvm1 dev1 base devwork",
        );
        let tree = build_hierarchy(&records);
        assert_eq!(names(&tree), vec!["base", "dev1"]);
        assert_eq!(depths(&tree), vec![0, 1]);
    }

    #[test]
    fn test_children_listed_before_parent_still_nest() {
        let records = vec![snap("vm", "c", "b"), snap("vm", "b", "a"), snap("vm", "a", "")];
        let tree = build_hierarchy(&records);
        assert_eq!(names(&tree), vec!["a", "b", "c"]);
        assert_eq!(depths(&tree), vec![0, 1, 2]);
    }

    #[test]
    fn test_dangling_parent_becomes_root() {
        let records = vec![snap("vm", "base", ""), snap("vm", "orphan", "deleted-one")];
        let tree = build_hierarchy(&records);
        assert_eq!(names(&tree), vec!["base", "orphan"]);
        assert_eq!(depths(&tree), vec![0, 0]);
    }

    #[test]
    fn test_parent_must_belong_to_same_instance() {
        let records = vec![snap("vm1", "base", ""), snap("vm2", "child", "base")];
        let tree = build_hierarchy(&records);
        assert_eq!(depths(&tree), vec![0, 0]);
    }

    #[test]
    fn test_siblings_keep_input_order() {
        let records = vec![
            snap("vm", "root", ""),
            snap("vm", "zeta", "root"),
            snap("vm", "alpha", "root"),
            snap("vm", "zeta-child", "zeta"),
        ];
        let tree = build_hierarchy(&records);
        assert_eq!(names(&tree), vec!["root", "zeta", "zeta-child", "alpha"]);

        let prefixes: Vec<&str> = tree.entries().iter().map(|e| e.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["", "├─ ", "│  └─ ", "└─ "]);
    }

    #[test]
    fn test_cycle_members_each_appear_once() {
        let records = vec![snap("vm", "a", "b"), snap("vm", "b", "a"), snap("vm", "self", "self")];
        let tree = build_hierarchy(&records);
        assert_eq!(tree.len(), 3);
        assert_eq!(names(&tree), vec!["self", "a", "b"]);
        assert_eq!(depths(&tree), vec![0, 0, 1]);
    }

    #[test]
    fn test_every_record_exactly_once() {
        let records: Vec<SnapshotRecord> = (0..20)
            .map(|i| {
                let parent = if i % 3 == 0 { String::new() } else { format!("s{}", i / 2) };
                snap("vm", &format!("s{i}"), &parent)
            })
            .collect();
        let tree = build_hierarchy(&records);
        assert_eq!(tree.len(), records.len());
        for r in &records {
            assert_eq!(tree.entries().iter().filter(|e| e.record == *r).count(), 1);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(build_hierarchy(&[]).is_empty());
    }
}
