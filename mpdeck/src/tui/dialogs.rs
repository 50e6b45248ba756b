//! Modal dialogs: confirm, loading, error and version

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    Frame,
};
use std::time::Instant;

use super::theme::{gauge_bar, CAUTION_AMBER, STYLE_DIM, STYLE_ERROR, STYLE_HEADING, STYLE_TEXT};
use super::widgets::{centered_popup, hint_line, render_popup};
use crate::app::busy::progress_for;
use crate::app::message::{Operation, Request};
use crate::app::AppContext;
use crate::domain::OpKind;

// =============================================================================
// CONFIRM
// =============================================================================

/// Yes/no prompt guarding a destructive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmView {
    operation: Operation,
}

impl ConfirmView {
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self { operation }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<Request> {
        match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
                Some(Request::Submit(self.operation.clone()))
            }
            KeyCode::Char('n' | 'N' | 'q') | KeyCode::Esc => Some(self.cancel_request()),
            KeyCode::Char('p' | 'P') => {
                if let Operation::Delete { purge, .. } = &mut self.operation {
                    *purge = !*purge;
                }
                None
            }
            _ => None,
        }
    }

    /// Where "no" leads: back to the snapshot manager for snapshot
    /// operations, to the table otherwise.
    #[must_use]
    pub fn cancel_request(&self) -> Request {
        match &self.operation {
            Operation::SnapshotRestore { vm, .. } | Operation::SnapshotDelete { vm, .. } => {
                Request::SnapshotManage { vm: vm.clone() }
            }
            _ => Request::BackToTable,
        }
    }

    fn prompt(&self) -> Vec<Line<'static>> {
        match &self.operation {
            Operation::Delete { vm, purge } => {
                let mut lines =
                    vec![Line::from(Span::styled(format!("  Delete {vm}?"), STYLE_TEXT))];
                if *purge {
                    lines.push(Line::from(Span::styled(
                        "  Purge: yes, the instance cannot be recovered",
                        STYLE_ERROR,
                    )));
                } else {
                    lines.push(Line::from(Span::styled(
                        "  Purge: no, recoverable until purged (p to toggle)",
                        STYLE_DIM,
                    )));
                }
                lines
            }
            Operation::PurgeAll => vec![Line::from(Span::styled(
                "  Permanently remove all deleted instances?",
                STYLE_TEXT,
            ))],
            Operation::SnapshotRestore { vm, name } => vec![
                Line::from(Span::styled(format!("  Restore {vm} to snapshot {name}?"), STYLE_TEXT)),
                Line::from(Span::styled("  The current state will be discarded", STYLE_ERROR)),
            ],
            Operation::SnapshotDelete { vm, name } => vec![Line::from(Span::styled(
                format!("  Delete snapshot {name} of {vm}?"),
                STYLE_TEXT,
            ))],
            other => vec![Line::from(Span::styled(format!("  {}?", other.kind()), STYLE_TEXT))],
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from("")];
        lines.extend(self.prompt());
        lines.push(Line::from(""));
        let mut hints = vec![("y", "yes"), ("n", "no")];
        if matches!(self.operation, Operation::Delete { .. }) {
            hints.push(("p", "toggle purge"));
        }
        lines.push(hint_line(&hints));

        render_popup(f, centered_popup(area, 60, 8), "Confirm", lines);
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Where a navigating operation lands once it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnTo {
    Table,
    Snapshots(String),
    Mounts(String),
}

/// Shown while a navigating operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingView {
    pub kind: OpKind,
    pub entity: Option<String>,
    pub return_to: ReturnTo,
    /// Set once the operation succeeded: the foreground refresh whose
    /// result completes the transition back to the table
    pub awaiting_refresh: Option<u64>,
    started: Instant,
}

impl LoadingView {
    #[must_use]
    pub fn new(kind: OpKind, entity: Option<String>, return_to: ReturnTo) -> Self {
        Self { kind, entity, return_to, awaiting_refresh: None, started: Instant::now() }
    }

    /// Whether this view is waiting on the operation `kind` on `entity`.
    #[must_use]
    pub fn is_for(&self, kind: OpKind, entity: Option<&str>) -> bool {
        self.kind == kind && self.entity.as_deref() == entity
    }

    /// Esc hides the dialog; the operation keeps running.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<Request> {
        matches!(key.code, KeyCode::Esc).then_some(Request::BackToTable)
    }

    pub fn render(&self, f: &mut Frame, area: Rect, ctx: &AppContext) {
        let now = Instant::now();
        let target = self.entity.as_deref().unwrap_or("all instances");

        let (phase, progress) = match self.entity.as_deref().and_then(|e| ctx.busy.get(e)) {
            Some(op) => (op.phase_at(now), op.progress_at(now)),
            None => {
                let elapsed = now.saturating_duration_since(self.started);
                (format!("{}...", self.kind), progress_for(elapsed))
            }
        };
        let phase = if self.awaiting_refresh.is_some() { "refreshing".to_string() } else { phase };

        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(format!("  {} {target}", self.kind), STYLE_HEADING)),
            Line::from(""),
            Line::from(vec![
                Span::raw("  "),
                Span::styled(gauge_bar(progress, 30), Style::new().fg(CAUTION_AMBER)),
                Span::styled(format!(" {phase}"), STYLE_DIM),
            ]),
            Line::from(""),
            hint_line(&[("Esc", "hide (keeps running)")]),
        ];
        render_popup(f, centered_popup(area, 60, 8), "Working", lines);
    }
}

// =============================================================================
// ERROR
// =============================================================================

/// Backend failure, shown verbatim until acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub title: String,
    pub message: String,
}

impl ErrorView {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { title: title.into(), message: message.into() }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<Request> {
        matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ' | 'q'))
            .then_some(Request::BackToTable)
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from("")];
        lines.extend(
            self.message.lines().map(|l| Line::from(Span::styled(format!("  {l}"), STYLE_TEXT))),
        );
        lines.push(Line::from(""));
        lines.push(hint_line(&[("Enter", "dismiss")]));

        let height = u16::try_from(self.message.lines().count()).unwrap_or(u16::MAX);
        let popup = centered_popup(area, 70, height.saturating_add(5).min(area.height));
        render_popup(f, popup, &self.title, lines);
    }
}

// =============================================================================
// VERSION
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionView {
    backend: Option<Result<String, String>>,
}

impl VersionView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_backend(&mut self, result: Result<String, String>) {
        self.backend = Some(result);
    }

    pub fn handle_key(&mut self, _key: &KeyEvent) -> Option<Request> {
        Some(Request::BackToTable)
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  mpdeck v{}", env!("CARGO_PKG_VERSION")),
                STYLE_HEADING,
            )),
            Line::from(""),
        ];
        match &self.backend {
            None => lines.push(Line::from(Span::styled("  querying backend...", STYLE_DIM))),
            Some(Ok(text)) => {
                let styled = |l: &str| Line::from(Span::styled(format!("  {l}"), STYLE_TEXT));
                lines.extend(text.lines().map(styled));
            }
            Some(Err(e)) => lines.push(Line::from(Span::styled(format!("  {e}"), STYLE_ERROR))),
        }
        lines.push(Line::from(""));
        lines.push(hint_line(&[("any key", "close")]));
        render_popup(f, centered_popup(area, 50, 9), "Version", lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_confirm_delete_toggles_purge() {
        let mut view = ConfirmView::new(Operation::Delete { vm: "vm1".into(), purge: false });
        assert_eq!(view.handle_key(&key(KeyCode::Char('p'))), None);
        assert_eq!(
            view.handle_key(&key(KeyCode::Char('y'))),
            Some(Request::Submit(Operation::Delete { vm: "vm1".into(), purge: true }))
        );
    }

    #[test]
    fn test_snapshot_confirm_cancels_to_manager() {
        let mut view =
            ConfirmView::new(Operation::SnapshotDelete { vm: "vm1".into(), name: "s1".into() });
        assert_eq!(
            view.handle_key(&key(KeyCode::Esc)),
            Some(Request::SnapshotManage { vm: "vm1".into() })
        );
        let mut purge = ConfirmView::new(Operation::PurgeAll);
        assert_eq!(purge.handle_key(&key(KeyCode::Char('n'))), Some(Request::BackToTable));
    }

    #[test]
    fn test_loading_only_esc_hides() {
        let mut view = LoadingView::new(OpKind::Launch, Some("vm1".into()), ReturnTo::Table);
        assert_eq!(view.handle_key(&key(KeyCode::Char('q'))), None);
        assert_eq!(view.handle_key(&key(KeyCode::Esc)), Some(Request::BackToTable));
        assert!(view.is_for(OpKind::Launch, Some("vm1")));
        assert!(!view.is_for(OpKind::Delete, Some("vm1")));
    }
}
