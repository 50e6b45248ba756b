//! Snapshot manager and snapshot create form
//!
//! The manager shows one VM's snapshots as a tree rebuilt from the flat
//! listing every time it is fetched:
//!
//! ```text
//! base                 initial install
//! ├─ dev1              devwork
//! │  └─ dev1-fix
//! └─ release
//! ```

use crossterm::event::{KeyCode, KeyEvent};
use mpdeck_common::{build_hierarchy, SnapshotRecord, SnapshotTree, TreeEntry};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    Frame,
};

use super::create::is_valid_name;
use super::theme::{CAUTION_AMBER, DECK_GREEN, SEL_LEFT, STYLE_DIM, STYLE_ERROR};
use super::widgets::{
    centered_popup, cycle_focus, error_line, hint_line, render_popup, scroll_offset, TextField,
};
use crate::app::message::{Operation, Request};

// =============================================================================
// MANAGER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotManager {
    vm: String,
    tree: Option<Result<SnapshotTree, String>>,
    selected_index: usize,
}

impl SnapshotManager {
    #[must_use]
    pub fn new(vm: impl Into<String>) -> Self {
        Self { vm: vm.into(), tree: None, selected_index: 0 }
    }

    #[must_use]
    pub fn vm(&self) -> &str {
        &self.vm
    }

    /// Replace the listing. Records of other instances are ignored.
    pub fn set_snapshots(&mut self, result: Result<Vec<SnapshotRecord>, String>) {
        self.tree = Some(result.map(|records| {
            let own: Vec<SnapshotRecord> =
                records.into_iter().filter(|r| r.instance == self.vm).collect();
            build_hierarchy(&own)
        }));
        let len = self.len();
        self.selected_index = self.selected_index.min(len.saturating_sub(1));
    }

    fn len(&self) -> usize {
        match &self.tree {
            Some(Ok(tree)) => tree.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<&TreeEntry> {
        match &self.tree {
            Some(Ok(tree)) => tree.get(self.selected_index),
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<Request> {
        let vm = self.vm.clone();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Some(Request::BackToTable),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_index = self.selected_index.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_index = (self.selected_index + 1).min(self.len().saturating_sub(1));
                None
            }
            KeyCode::Char('c') => Some(Request::SnapshotCreate { vm }),
            KeyCode::Char('r') => Some(Request::SnapshotManage { vm }),
            KeyCode::Enter | KeyCode::Char('R') => {
                let name = self.selected()?.record.name.clone();
                Some(Request::Confirm(Operation::SnapshotRestore { vm, name }))
            }
            KeyCode::Char('d') => {
                let name = self.selected()?.record.name.clone();
                Some(Request::Confirm(Operation::SnapshotDelete { vm, name }))
            }
            _ => None,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let popup = centered_popup(area, 70, area.height.saturating_sub(4).max(8));
        let mut lines = vec![Line::from("")];

        match &self.tree {
            None => lines.push(Line::from(Span::styled("  loading...", STYLE_DIM))),
            Some(Err(e)) => lines.push(Line::from(Span::styled(format!("  {e}"), STYLE_ERROR))),
            Some(Ok(tree)) if tree.is_empty() => {
                lines.push(Line::from(Span::styled("  no snapshots yet (c to create)", STYLE_DIM)));
            }
            Some(Ok(tree)) => {
                let visible = usize::from(popup.height.saturating_sub(5)).max(1);
                let offset = scroll_offset(self.selected_index, visible);
                for (idx, entry) in tree.entries().iter().enumerate().skip(offset).take(visible) {
                    lines.push(entry_line(entry, idx == self.selected_index));
                }
            }
        }

        lines.push(Line::from(""));
        lines.push(hint_line(&[
            ("c", "create"),
            ("Enter", "restore"),
            ("d", "delete"),
            ("r", "reload"),
            ("Esc", "back"),
        ]));
        render_popup(f, popup, &format!("Snapshots: {}", self.vm), lines);
    }
}

fn entry_line(entry: &TreeEntry, selected: bool) -> Line<'static> {
    let marker = if selected { SEL_LEFT } else { " " };
    let name_style = if selected {
        Style::new().fg(DECK_GREEN).add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::new().fg(DECK_GREEN)
    };
    Line::from(vec![
        Span::styled(format!(" {marker} "), Style::new().fg(CAUTION_AMBER)),
        Span::styled(entry.prefix.clone(), STYLE_DIM),
        Span::styled(entry.record.name.clone(), name_style),
        Span::styled(format!("  {}", entry.record.comment), STYLE_DIM),
    ])
}

// =============================================================================
// CREATE FORM
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotForm {
    vm: String,
    name: TextField,
    comment: TextField,
    focus: usize,
    error: Option<String>,
}

impl SnapshotForm {
    #[must_use]
    pub fn new(vm: impl Into<String>) -> Self {
        Self { vm: vm.into(), ..Self::default() }
    }

    #[must_use]
    pub fn vm(&self) -> &str {
        &self.vm
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<Request> {
        match key.code {
            KeyCode::Esc => return Some(Request::SnapshotManage { vm: self.vm.clone() }),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = cycle_focus(self.focus, 2, true);
            }
            KeyCode::Enter => {
                let name = self.name.trimmed();
                if !is_valid_name(name) {
                    self.error = Some(
                        "Name must start with a letter and use only letters, digits and -".into(),
                    );
                    return None;
                }
                return Some(Request::Submit(Operation::SnapshotCreate {
                    vm: self.vm.clone(),
                    name: name.to_string(),
                    comment: self.comment.trimmed().to_string(),
                }));
            }
            _ => {
                let field = if self.focus == 0 { &mut self.name } else { &mut self.comment };
                if field.handle_key(key) {
                    self.error = None;
                }
            }
        }
        None
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(""),
            self.name.line("Name", self.focus == 0),
            self.comment.line("Comment", self.focus == 1),
            Line::from(""),
            error_line(self.error.as_deref()),
            hint_line(&[("Tab", "next"), ("Enter", "create"), ("Esc", "cancel")]),
        ];
        render_popup(f, centered_popup(area, 60, 8), &format!("Snapshot {}", self.vm), lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn snap(instance: &str, name: &str, parent: &str) -> SnapshotRecord {
        SnapshotRecord {
            instance: instance.into(),
            name: name.into(),
            parent: parent.into(),
            comment: String::new(),
        }
    }

    #[test]
    fn test_manager_builds_tree_for_its_vm() {
        let mut manager = SnapshotManager::new("vm1");
        manager.set_snapshots(Ok(vec![
            snap("vm1", "dev1", "base"),
            snap("vm2", "other", ""),
            snap("vm1", "base", ""),
        ]));
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.selected().unwrap().record.name, "base");

        manager.handle_key(&key(KeyCode::Down));
        assert_eq!(manager.selected().unwrap().depth, 1);
        assert_eq!(
            manager.handle_key(&key(KeyCode::Char('d'))),
            Some(Request::Confirm(Operation::SnapshotDelete {
                vm: "vm1".into(),
                name: "dev1".into()
            }))
        );
    }

    #[test]
    fn test_restore_needs_a_selection() {
        let mut manager = SnapshotManager::new("vm1");
        manager.set_snapshots(Ok(vec![]));
        assert_eq!(manager.handle_key(&key(KeyCode::Enter)), None);
    }

    #[test]
    fn test_form_validates_name() {
        let mut form = SnapshotForm::new("vm1");
        assert_eq!(form.handle_key(&key(KeyCode::Enter)), None);
        assert!(form.error().is_some());

        for c in "pre-upgrade".chars() {
            form.handle_key(&key(KeyCode::Char(c)));
        }
        form.handle_key(&key(KeyCode::Tab));
        for c in "before apt".chars() {
            form.handle_key(&key(KeyCode::Char(c)));
        }
        assert_eq!(
            form.handle_key(&key(KeyCode::Enter)),
            Some(Request::Submit(Operation::SnapshotCreate {
                vm: "vm1".into(),
                name: "pre-upgrade".into(),
                comment: "before apt".into(),
            }))
        );
    }

    #[test]
    fn test_form_escape_returns_to_manager() {
        let mut form = SnapshotForm::new("vm1");
        assert_eq!(
            form.handle_key(&key(KeyCode::Esc)),
            Some(Request::SnapshotManage { vm: "vm1".into() })
        );
    }
}
