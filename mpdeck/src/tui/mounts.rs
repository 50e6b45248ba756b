//! Mount manager and the add/modify mount form

use crossterm::event::{KeyCode, KeyEvent};
use mpdeck_common::MountRecord;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    Frame,
};
use std::path::Path;

use super::theme::{CAUTION_AMBER, DECK_GREEN, SEL_LEFT, STYLE_DIM, STYLE_ERROR};
use super::widgets::{
    centered_popup, cycle_focus, error_line, hint_line, render_popup, scroll_offset,
    truncate_for_display, TextField,
};
use crate::app::message::{Operation, Request};

// =============================================================================
// MANAGER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountManager {
    vm: String,
    mounts: Option<Result<Vec<MountRecord>, String>>,
    selected_index: usize,
}

impl MountManager {
    #[must_use]
    pub fn new(vm: impl Into<String>) -> Self {
        Self { vm: vm.into(), mounts: None, selected_index: 0 }
    }

    #[must_use]
    pub fn vm(&self) -> &str {
        &self.vm
    }

    pub fn set_mounts(&mut self, result: Result<Vec<MountRecord>, String>) {
        self.mounts = Some(result);
        self.selected_index = self.selected_index.min(self.len().saturating_sub(1));
    }

    fn len(&self) -> usize {
        match &self.mounts {
            Some(Ok(mounts)) => mounts.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<&MountRecord> {
        match &self.mounts {
            Some(Ok(mounts)) => mounts.get(self.selected_index),
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
            KeyCode::Char('a') => Some(Request::MountAdd { vm }),
            KeyCode::Char('r') => Some(Request::MountManage { vm }),
            KeyCode::Enter | KeyCode::Char('e') => {
                let mount = self.selected()?.clone();
                Some(Request::MountModify { vm, mount })
            }
            KeyCode::Char('d' | 'u') => {
                let target = self.selected()?.target.clone();
                Some(Request::Submit(Operation::Umount { vm, target }))
            }
            _ => None,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let wanted = u16::try_from(self.len().max(1) + 5).unwrap_or(u16::MAX);
        let popup = centered_popup(area, 80, wanted.min(area.height.saturating_sub(4)).max(8));
        let mut lines = vec![Line::from("")];
        match &self.mounts {
            None => lines.push(Line::from(Span::styled("  loading...", STYLE_DIM))),
            Some(Err(e)) => lines.push(Line::from(Span::styled(format!("  {e}"), STYLE_ERROR))),
            Some(Ok(mounts)) if mounts.is_empty() => {
                lines.push(Line::from(Span::styled("  nothing mounted (a to add)", STYLE_DIM)));
            }
            Some(Ok(mounts)) => {
                let visible = usize::from(popup.height.saturating_sub(5)).max(1);
                let offset = scroll_offset(self.selected_index, visible);
                for (idx, mount) in mounts.iter().enumerate().skip(offset).take(visible) {
                    lines.push(mount_line(mount, idx == self.selected_index));
                }
            }
        }
        lines.push(Line::from(""));
        lines.push(hint_line(&[
            ("a", "add"),
            ("Enter", "modify"),
            ("u", "unmount"),
            ("r", "reload"),
            ("Esc", "back"),
        ]));
        render_popup(f, popup, &format!("Mounts: {}", self.vm), lines);
    }
}

/// Host paths longer than this are cut so the target stays on screen
const SOURCE_WIDTH: usize = 40;

fn mount_line(mount: &MountRecord, selected: bool) -> Line<'static> {
    let marker = if selected { SEL_LEFT } else { " " };
    let style = if selected {
        Style::new().fg(DECK_GREEN).add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::new().fg(DECK_GREEN)
    };
    let mut spans = vec![
        Span::styled(format!(" {marker} "), Style::new().fg(CAUTION_AMBER)),
        Span::styled(truncate_for_display(&mount.source, SOURCE_WIDTH), style),
        Span::styled(" => ", STYLE_DIM),
        Span::styled(mount.target.clone(), style),
    ];
    if !mount.uid_mappings.is_empty() || !mount.gid_mappings.is_empty() {
        spans.push(Span::styled(
            format!("  uid {} gid {}", mount.uid_mappings.join(","), mount.gid_mappings.join(",")),
            STYLE_DIM,
        ));
    }
    Line::from(spans)
}

// =============================================================================
// ADD / MODIFY FORM
// =============================================================================

/// Source/target form. With `original` set it modifies that mount
/// (unmount, then mount again), otherwise it adds a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountForm {
    vm: String,
    original: Option<MountRecord>,
    source: TextField,
    target: TextField,
    focus: usize,
    error: Option<String>,
}

impl MountForm {
    #[must_use]
    pub fn add(vm: impl Into<String>) -> Self {
        Self { vm: vm.into(), ..Self::default() }
    }

    #[must_use]
    pub fn modify(vm: impl Into<String>, mount: MountRecord) -> Self {
        Self {
            vm: vm.into(),
            source: TextField::with_value(mount.source.clone()),
            target: TextField::with_value(mount.target.clone()),
            original: Some(mount),
            ..Self::default()
        }
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
            KeyCode::Esc => return Some(Request::MountManage { vm: self.vm.clone() }),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = cycle_focus(self.focus, 2, true);
            }
            KeyCode::Enter => match self.validate() {
                Ok(op) => return Some(Request::Submit(op)),
                Err(e) => self.error = Some(e),
            },
            _ => {
                let field = if self.focus == 0 { &mut self.source } else { &mut self.target };
                if field.handle_key(key) {
                    self.error = None;
                }
            }
        }
        None
    }

    fn validate(&self) -> Result<Operation, String> {
        let source = self.source.trimmed();
        let target = self.target.trimmed();
        if source.is_empty() {
            return Err("Source directory is required".to_string());
        }
        if !Path::new(source).is_dir() {
            return Err(format!("{source} is not a directory on this host"));
        }
        if target.is_empty() {
            return Err("Target path is required".to_string());
        }

        let vm = self.vm.clone();
        let (source, target) = (source.to_string(), target.to_string());
        match &self.original {
            None => Ok(Operation::Mount { vm, source, target }),
            Some(old) if old.source == source && old.target == target => {
                Err("Nothing changed".to_string())
            }
            Some(old) => {
                Ok(Operation::ModifyMount { vm, old_target: old.target.clone(), source, target })
            }
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let title = match &self.original {
            None => format!("Mount into {}", self.vm),
            Some(m) => format!("Modify {}:{}", self.vm, m.target),
        };
        let lines = vec![
            Line::from(""),
            self.source.line("Host path", self.focus == 0),
            self.target.line("VM path", self.focus == 1),
            Line::from(""),
            error_line(self.error.as_deref()),
            hint_line(&[("Tab", "next"), ("Enter", "apply"), ("Esc", "cancel")]),
        ];
        render_popup(f, centered_popup(area, 70, 8), &title, lines);
    }
}
