//! # Terminal User Interface (TUI)
//!
//! Full-screen `ratatui` front-end for the session coordinator in
//! [`crate::app`].
//!
//! ## Layout
//!
//! ```text
//! ┌ MPDECK | 3 VMs | 1 busy | host 8 cpu 16384 MiB ─────────┐  header
//! │ NAME         STATE            IPV4          RELEASE     │
//! │▶ dev         Running          10.0.0.4      24.04     ◀ │  table
//! │  build       ██▌─── Stopping  10.0.0.5      22.04       │  (+ overlay
//! │                                                         │   per view)
//! └ notice / refresh error / key hints ─────────────────────┘  status bar
//! ```
//!
//! The table is always drawn; every other view is a centered popup on top
//! of it.
//!
//! ## Sub-Modules
//!
//! - `table` - VM table with filter, sort and busy gauges
//! - `create`, `resources` - launch and resize forms
//! - `snapshots`, `mounts` - per-VM managers and their forms
//! - `dialogs` - confirm, loading, error and version popups
//! - `info`, `help` - read-only overlays
//! - `theme`, `widgets` - palette and shared building blocks

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

pub mod create;
pub mod dialogs;
mod help;
pub mod info;
pub mod mounts;
pub mod resources;
pub mod snapshots;
pub mod table;
mod theme;
pub mod widgets;

use crate::app::{App, Dispatcher, Effect, Message, RefreshScheduler, View};
use theme::{
    ALERT_RED, CAUTION_AMBER, DECK_GREEN, STYLE_DIM, STYLE_ERROR, STYLE_HEADING, STYLE_KEY,
    STYLE_TEXT,
};

// =============================================================================
// RENDERING
// =============================================================================

/// Draw one frame for the current state of `app`.
pub fn render(f: &mut Frame, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Fill(1),   // Table
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    render_header(f, outer[0], app);
    app.table().render(f, outer[1], app.context());
    render_overlay(f, outer[1], app);
    render_status(f, outer[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let ctx = app.context();
    let vm_count =
        if ctx.loading { "loading".to_string() } else { format!("{} VMs", ctx.vms.len()) };

    let mut spans = vec![
        Span::styled("MPDECK", STYLE_HEADING),
        Span::styled(" | ", STYLE_DIM),
        Span::styled(vm_count, Style::new().fg(DECK_GREEN)),
    ];
    if !ctx.busy.is_empty() {
        spans.push(Span::styled(" | ", STYLE_DIM));
        spans.push(Span::styled(
            format!("{} busy", ctx.busy.len()),
            Style::new().fg(CAUTION_AMBER),
        ));
    }
    spans.push(Span::styled(" | ", STYLE_DIM));
    spans.push(Span::styled(
        format!("host {} cpu {} MiB", ctx.host.cpus, ctx.host.memory_mb),
        STYLE_DIM,
    ));
    spans.push(Span::styled(" | ", STYLE_DIM));
    spans.push(Span::styled(format!("sort:{}", app.table().sort().label()), STYLE_DIM));
    if !app.table().filter().is_empty() {
        spans.push(Span::styled(" | ", STYLE_DIM));
        spans.push(Span::styled(
            format!("filter:{}", app.table().filter()),
            Style::new().fg(CAUTION_AMBER),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default().borders(Borders::ALL).border_style(Style::new().fg(DECK_GREEN)),
    );
    f.render_widget(header, area);
}

fn render_overlay(f: &mut Frame, area: Rect, app: &App) {
    let ctx = app.context();
    match app.view() {
        View::Table => {}
        View::Help => help::render_help(f, area),
        View::Version(view) => view.render(f, area),
        View::Info(view) => view.render(f, area),
        View::Loading(view) => view.render(f, area, ctx),
        View::Error(view) => view.render(f, area),
        View::Confirm(view) => view.render(f, area),
        View::Create(view) => view.render(f, area, ctx),
        View::SnapshotCreate(view) => view.render(f, area),
        View::SnapshotManage(view) => view.render(f, area),
        View::MountManage(view) => view.render(f, area),
        View::MountAdd(view) | View::MountModify(view) => view.render(f, area),
        View::Resources(view) => view.render(f, area, ctx),
    }
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let ctx = app.context();
    let mut spans = Vec::new();

    if app.table().is_editing_filter() {
        spans.push(Span::styled("/", STYLE_KEY));
        spans.push(Span::styled(format!("{}_", app.table().filter()), STYLE_TEXT));
        spans.push(Span::styled("  Enter:keep  Esc:clear", STYLE_DIM));
    } else if let Some(notice) = &ctx.notice {
        let style = if notice.is_error { STYLE_ERROR } else { Style::new().fg(DECK_GREEN) };
        spans.push(Span::styled(notice.text.clone(), style));
        spans.push(Span::styled("  ", STYLE_DIM));
    }

    if matches!(app.view(), View::Table) && !app.table().is_editing_filter() {
        for (key, label) in [("q", "Quit "), ("?", "Help "), ("c", "Create "), ("Enter", "Info ")] {
            spans.push(Span::styled(key, STYLE_KEY));
            spans.push(Span::styled(format!(":{label}"), STYLE_DIM));
        }
    }

    let border = if ctx.last_refresh_error.is_some() { ALERT_RED } else { DECK_GREEN };
    let mut block = Block::default().borders(Borders::ALL).border_style(Style::new().fg(border));
    if let Some(e) = &ctx.last_refresh_error {
        block = block.title(Span::styled(format!(" refresh failed: {e} "), STYLE_ERROR));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

// =============================================================================
// EVENT LOOP
// =============================================================================

/// Run the interactive session until the user quits.
///
/// Messages from worker threads and the refresh timer arrive on `rx`; keys
/// are read from the terminal. Both are fed to [`App::update`] on this
/// thread, and the resulting effects are performed here.
///
/// # Errors
/// Returns an error if terminal setup or rendering fails
pub fn run(
    mut app: App,
    rx: &Receiver<Message>,
    dispatcher: &Dispatcher,
    refresh: &RefreshScheduler,
) -> Result<()> {
    // -------------------------------------------------------------------------
    // Terminal Setup
    // -------------------------------------------------------------------------
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut effects = EffectRunner { dispatcher, refresh, clipboard: None };
    let result = event_loop(&mut terminal, &mut app, rx, &mut effects);

    // -------------------------------------------------------------------------
    // Cleanup (always, even when the loop failed)
    // -------------------------------------------------------------------------
    refresh.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("session ended");
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rx: &Receiver<Message>,
    effects: &mut EffectRunner<'_>,
) -> Result<()> {
    let startup = app.start();
    effects.apply(app, startup);

    loop {
        // Drain worker results and timer ticks (non-blocking)
        while let Ok(message) = rx.try_recv() {
            let produced = app.update(message);
            effects.apply(app, produced);
        }

        terminal.draw(|f| render(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let produced = app.update(Message::Key(key));
                    effects.apply(app, produced);
                }
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

/// Performs the side effects requested by the coordinator.
struct EffectRunner<'a> {
    dispatcher: &'a Dispatcher,
    refresh: &'a RefreshScheduler,
    /// Created on first yank and kept alive: on X11 the clipboard contents
    /// vanish when the owner is dropped
    clipboard: Option<arboard::Clipboard>,
}

impl EffectRunner<'_> {
    /// Perform `effects`. Effects completed on this thread report back to
    /// `app` right away, and whatever those replies produce is performed too.
    fn apply(&mut self, app: &mut App, effects: Vec<Effect>) {
        let mut pending: VecDeque<Effect> = effects.into();
        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Dispatch(command) => self.dispatcher.dispatch(command),
                Effect::ArmRefresh => self.refresh.arm(),
                Effect::Yank { vm, text } => {
                    let result = self.yank(&text);
                    pending.extend(app.update(Message::Yanked { vm, text, result }));
                }
                Effect::Quit => self.refresh.stop(),
            }
        }
    }

    fn yank(&mut self, text: &str) -> Result<(), String> {
        if self.clipboard.is_none() {
            let clipboard = arboard::Clipboard::new().map_err(|e| {
                warn!("clipboard unavailable: {e}");
                e.to_string()
            })?;
            self.clipboard = Some(clipboard);
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return Err("no clipboard".to_string());
        };
        clipboard.set_text(text).map_err(|e| {
            warn!("failed to copy to clipboard: {e}");
            e.to_string()
        })
    }
}
