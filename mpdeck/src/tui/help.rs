//! Help overlay with keyboard shortcuts

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    Frame,
};

use super::theme::{STYLE_DIM, STYLE_HEADING, STYLE_KEY, STYLE_TEXT};
use super::widgets::{centered_popup, render_popup};

const TABLE_KEYS: &[(&str, &str)] = &[
    ("↑↓ j k", "select VM"),
    ("Enter i", "details"),
    ("s / S", "start / stop"),
    ("u", "suspend"),
    ("R", "recover deleted VM"),
    ("c", "create VM"),
    ("d", "delete VM"),
    ("P", "purge deleted VMs"),
    ("n", "snapshots"),
    ("m", "mounts"),
    ("e", "resources (cpu, memory, disk)"),
    ("y", "copy IPv4 to clipboard"),
    ("/", "filter by name"),
    ("o", "cycle sort order"),
    ("r", "refresh now"),
    ("v", "version"),
    ("q", "quit (Ctrl-C anywhere)"),
];

pub fn render_help(f: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("  What You're Looking At", STYLE_HEADING)),
        Line::from(Span::styled(
            "  Every VM the backend knows about, refreshed every second.",
            STYLE_DIM,
        )),
        Line::from(Span::styled(
            "  Rows with a gauge have an operation in flight.",
            STYLE_DIM,
        )),
        Line::from(""),
        Line::from(Span::styled("  Keys", STYLE_HEADING)),
    ];

    for (keys, action) in TABLE_KEYS {
        lines.push(Line::from(vec![
            Span::styled(format!("  {keys:<10}"), STYLE_KEY),
            Span::styled(*action, STYLE_TEXT),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("  Press any key to close", STYLE_DIM)));

    let height = u16::try_from(lines.len() + 2).unwrap_or(u16::MAX);
    render_popup(f, centered_popup(area, 60, height), "Help", lines);
}
