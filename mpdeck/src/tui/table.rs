//! Main VM table
//!
//! # Data Flow
//!
//! ```text
//! AppContext.vms ─┬─▶ filter (name substring) ─▶ sort ─▶ rows ─▶ render()
//! busy(Creating) ─┘        pending rows for VMs not listed yet
//! ```
//!
//! Rows are rebuilt by [`TableView::sync`] whenever the VM collection, the
//! filter or the sort changes. The selection follows the VM by name across
//! rebuilds and falls back to the same position when that VM disappears.

use crossterm::event::{KeyCode, KeyEvent};
use mpdeck_common::{LifecycleState, VmSummary};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};
use std::cmp::Ordering;
use std::time::Instant;

use super::theme::{gauge_bar, state_color, CAUTION_AMBER, DECK_GREEN, INFO_DIM, STYLE_DIM};
use super::widgets::TextField;
use crate::app::AppContext;
use crate::domain::BusyKind;

/// Table sort order, cycled with `o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    State,
    Release,
}

impl SortKey {
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Name => Self::State,
            Self::State => Self::Release,
            Self::Release => Self::Name,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::State => "state",
            Self::Release => "release",
        }
    }
}

/// One table row. `vm` is `None` for a VM that is still being created and
/// isn't reported by the backend yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub name: String,
    pub vm: Option<VmSummary>,
}

impl TableRow {
    fn state(&self) -> LifecycleState {
        self.vm.as_ref().map_or(LifecycleState::Unknown, |vm| vm.state)
    }

    fn release(&self) -> &str {
        self.vm.as_ref().map_or("", |vm| vm.release.as_str())
    }
}

#[derive(Debug, Default)]
pub struct TableView {
    rows: Vec<TableRow>,
    selected_index: usize,
    filter: String,
    /// Present while the filter is being edited
    filter_input: Option<TextField>,
    sort: SortKey,
}

impl TableView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild rows from `ctx`, keeping the selected VM selected.
    pub fn sync(&mut self, ctx: &AppContext) {
        let previous = self.selected_name().map(str::to_string);
        self.rows = build_rows(ctx, &self.filter, self.sort);

        if let Some(name) = previous {
            if let Some(idx) = self.rows.iter().position(|r| r.name == name) {
                self.selected_index = idx;
                return;
            }
        }
        self.selected_index = self.selected_index.min(self.rows.len().saturating_sub(1));
    }

    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    #[must_use]
    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    #[must_use]
    pub fn selected_row(&self) -> Option<&TableRow> {
        self.rows.get(self.selected_index)
    }

    #[must_use]
    pub fn selected_name(&self) -> Option<&str> {
        self.selected_row().map(|r| r.name.as_str())
    }

    /// Selected VM, if it is one the backend knows about.
    #[must_use]
    pub fn selected_vm(&self) -> Option<&VmSummary> {
        self.selected_row().and_then(|r| r.vm.as_ref())
    }

    pub fn select(&mut self, name: &str) {
        if let Some(idx) = self.rows.iter().position(|r| r.name == name) {
            self.selected_index = idx;
        }
    }

    pub fn scroll_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.selected_index = (self.selected_index + 1).min(self.rows.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.rows.len().saturating_sub(1);
    }

    #[must_use]
    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn cycle_sort(&mut self, ctx: &AppContext) {
        self.sort = self.sort.next();
        self.sync(ctx);
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[must_use]
    pub fn is_editing_filter(&self) -> bool {
        self.filter_input.is_some()
    }

    pub fn start_filter(&mut self) {
        self.filter_input = Some(TextField::with_value(self.filter.clone()));
    }

    /// Edit the filter; rows narrow as you type. Enter keeps the filter,
    /// Esc clears it.
    pub fn handle_filter_key(&mut self, key: &KeyEvent, ctx: &AppContext) {
        let Some(input) = self.filter_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Enter => {
                self.filter_input = None;
                return;
            }
            KeyCode::Esc => {
                self.filter_input = None;
                self.filter.clear();
            }
            _ => {
                if !input.handle_key(key) {
                    return;
                }
                self.filter = input.trimmed().to_string();
            }
        }
        self.sync(ctx);
    }

    pub fn render(&self, f: &mut Frame, area: Rect, ctx: &AppContext) {
        let now = Instant::now();

        let header = Row::new(
            ["NAME", "STATE", "IPV4", "RELEASE", "CPU", "DISK", "MEMORY", "MNT", "SNAP"]
                .into_iter()
                .map(|h| Cell::from(h).style(Style::new().fg(CAUTION_AMBER))),
        )
        .style(Style::new().add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = self.rows.iter().map(|row| render_row(row, ctx, now)).collect();

        let title = match (&self.filter_input, self.filter.is_empty()) {
            (Some(input), _) => format!("[ VMS /{}_ ]", input.value()),
            (None, false) => {
                format!("[ VMS /{} {}/{} ]", self.filter, self.rows.len(), ctx.vms.len())
            }
            (None, true) => format!("[ VMS {} | sort: {} ]", self.rows.len(), self.sort.label()),
        };

        let table = Table::new(
            rows,
            [
                Constraint::Min(14),
                Constraint::Length(26),
                Constraint::Length(16),
                Constraint::Min(16),
                Constraint::Length(4),
                Constraint::Length(18),
                Constraint::Length(18),
                Constraint::Length(4),
                Constraint::Length(5),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::new().fg(DECK_GREEN)),
        )
        .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default();
        if !self.rows.is_empty() {
            state.select(Some(self.selected_index));
        }
        f.render_stateful_widget(table, area, &mut state);
    }
}

fn render_row<'a>(row: &'a TableRow, ctx: &AppContext, now: Instant) -> Row<'a> {
    let state_cell = match ctx.busy.get(&row.name) {
        Some(op) => Cell::from(Span::styled(
            format!("{} {}", gauge_bar(op.progress_at(now), 8), op.phase_at(now)),
            Style::new().fg(CAUTION_AMBER),
        )),
        None => match &row.vm {
            Some(vm) => {
                Cell::from(Span::styled(vm.state.label(), Style::new().fg(state_color(vm.state))))
            }
            None => Cell::from(Span::styled("pending", STYLE_DIM)),
        },
    };

    let Some(vm) = &row.vm else {
        return Row::new(vec![Cell::from(row.name.as_str()), state_cell]);
    };

    let ipv4 = match vm.ipv4.len() {
        0 => "--".to_string(),
        1 => vm.ipv4[0].clone(),
        n => format!("{} +{}", vm.ipv4[0], n - 1),
    };

    Row::new(vec![
        Cell::from(vm.name.as_str()),
        state_cell,
        Cell::from(ipv4),
        Cell::from(vm.release.as_str()),
        Cell::from(vm.cpus.map_or_else(|| "-".to_string(), |c| c.to_string())),
        Cell::from(Span::styled(vm.disk_usage.as_str(), Style::new().fg(INFO_DIM))),
        Cell::from(Span::styled(vm.memory_usage.as_str(), Style::new().fg(INFO_DIM))),
        Cell::from(vm.mount_count.to_string()),
        Cell::from(vm.snapshot_count.to_string()),
    ])
}

/// Filtered, sorted rows: every listed VM plus not-yet-listed VMs being created.
fn build_rows(ctx: &AppContext, filter: &str, sort: SortKey) -> Vec<TableRow> {
    let needle = filter.to_lowercase();
    let matches = |name: &str| needle.is_empty() || name.to_lowercase().contains(&needle);

    let mut rows: Vec<TableRow> = ctx
        .vms
        .iter()
        .filter(|vm| matches(&vm.name))
        .map(|vm| TableRow { name: vm.name.clone(), vm: Some(vm.clone()) })
        .collect();

    let mut pending: Vec<&str> = ctx
        .busy
        .entities_of(BusyKind::Creating)
        .filter(|&name| ctx.vm(name).is_none() && matches(name))
        .collect();
    pending.sort_unstable();
    rows.extend(pending.into_iter().map(|name| TableRow { name: name.to_string(), vm: None }));

    rows.sort_by(|a, b| compare(a, b, sort));
    rows
}

fn compare(a: &TableRow, b: &TableRow, sort: SortKey) -> Ordering {
    let primary = match sort {
        SortKey::Name => Ordering::Equal,
        SortKey::State => state_rank(a.state()).cmp(&state_rank(b.state())),
        SortKey::Release => a.release().cmp(b.release()),
    };
    primary.then_with(|| a.name.cmp(&b.name))
}

fn state_rank(state: LifecycleState) -> u8 {
    match state {
        LifecycleState::Running => 0,
        LifecycleState::Suspended => 1,
        LifecycleState::Stopped => 2,
        LifecycleState::Deleted => 3,
        LifecycleState::Unknown => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::host::HostCapacity;
    use crossterm::event::KeyModifiers;

    fn vm(name: &str, state: LifecycleState, release: &str) -> VmSummary {
        VmSummary {
            name: name.to_string(),
            state,
            release: release.to_string(),
            ..VmSummary::default()
        }
    }

    fn ctx_with(vms: Vec<VmSummary>) -> AppContext {
        let mut ctx =
            AppContext::new(HostCapacity { cpus: 4, memory_mb: 8192 }, AppConfig::default());
        ctx.vms = vms;
        ctx
    }

    fn names(view: &TableView) -> Vec<&str> {
        view.rows().iter().map(|r| r.name.as_str()).collect()
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_selection_follows_name_across_refresh() {
        let mut ctx = ctx_with(vec![
            vm("bravo", LifecycleState::Running, ""),
            vm("charlie", LifecycleState::Running, ""),
        ]);
        let mut view = TableView::new();
        view.sync(&ctx);
        view.select("charlie");

        ctx.vms.insert(0, vm("alpha", LifecycleState::Stopped, ""));
        view.sync(&ctx);
        assert_eq!(view.selected_name(), Some("charlie"));
        assert_eq!(view.selected_index(), 2);

        ctx.vms.retain(|v| v.name != "charlie");
        view.sync(&ctx);
        assert_eq!(view.selected_name(), Some("bravo"));
    }

    #[test]
    fn test_sort_cycle() {
        let ctx = ctx_with(vec![
            vm("a", LifecycleState::Stopped, "24.04"),
            vm("b", LifecycleState::Running, "22.04"),
        ]);
        let mut view = TableView::new();
        view.sync(&ctx);
        assert_eq!(names(&view), vec!["a", "b"]);
        view.cycle_sort(&ctx);
        assert_eq!(view.sort(), SortKey::State);
        assert_eq!(names(&view), vec!["b", "a"]);
        view.cycle_sort(&ctx);
        assert_eq!(names(&view), vec!["b", "a"]);
        view.cycle_sort(&ctx);
        assert_eq!(view.sort(), SortKey::Name);
    }

    #[test]
    fn test_filter_narrows_while_typing() {
        let ctx = ctx_with(vec![
            vm("web-1", LifecycleState::Running, ""),
            vm("db-1", LifecycleState::Running, ""),
        ]);
        let mut view = TableView::new();
        view.sync(&ctx);
        view.start_filter();
        view.handle_filter_key(&key('W'), &ctx);
        assert_eq!(names(&view), vec!["web-1"]);

        view.handle_filter_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), &ctx);
        assert!(!view.is_editing_filter());
        assert_eq!(view.filter(), "W");

        view.start_filter();
        view.handle_filter_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE), &ctx);
        assert_eq!(view.filter(), "");
        assert_eq!(view.rows().len(), 2);
    }

    #[test]
    fn test_pending_rows_for_vms_being_created() {
        let mut ctx = ctx_with(vec![vm("existing", LifecycleState::Running, "")]);
        ctx.busy.begin("fresh", BusyKind::Creating);
        ctx.busy.begin("existing", BusyKind::Stopping);
        let mut view = TableView::new();
        view.sync(&ctx);
        assert_eq!(names(&view), vec!["existing", "fresh"]);
        view.select("fresh");
        assert!(view.selected_vm().is_none());

        ctx.vms.push(vm("fresh", LifecycleState::Running, ""));
        view.sync(&ctx);
        assert_eq!(view.rows().len(), 2);
        assert!(view.selected_vm().is_some());
    }

    #[test]
    fn test_navigation_clamps() {
        let ctx = ctx_with(vec![vm("a", LifecycleState::Running, "")]);
        let mut view = TableView::new();
        view.sync(&ctx);
        view.scroll_down();
        view.scroll_down();
        assert_eq!(view.selected_index(), 0);
        view.scroll_up();
        assert_eq!(view.selected_index(), 0);
    }
}
