//! Small building blocks shared by the form and dialog views

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::theme::{STYLE_DIM, STYLE_ERROR, STYLE_KEY, STYLE_LABEL, STYLE_POPUP, STYLE_TEXT};

/// Create a centered popup area with given width percentage and height in lines
#[must_use]
pub fn centered_popup(area: Rect, width_percent: u16, height_lines: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(height_lines), Constraint::Fill(1)])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

/// Draw `lines` in a bordered popup over whatever is underneath.
pub fn render_popup(f: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'_>>) {
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default().borders(Borders::ALL).title(format!(" {title} ")).style(STYLE_POPUP),
        );
    f.render_widget(Clear, area);
    f.render_widget(widget, area);
}

/// First row to draw so that `selected` stays inside a window of
/// `visible` rows.
#[must_use]
pub fn scroll_offset(selected: usize, visible: usize) -> usize {
    selected.saturating_sub(visible.max(1) - 1)
}

/// Truncate a string for display, adding "..." if too long
#[must_use]
pub fn truncate_for_display(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Key hint line: `[("Enter", "submit"), ("Esc", "cancel")]`
#[must_use]
pub fn hint_line(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for (key, action) in hints {
        spans.push(Span::styled(*key, STYLE_KEY));
        spans.push(Span::styled(format!(":{action}  "), STYLE_DIM));
    }
    Line::from(spans)
}

/// Inline validation error, or an empty line.
#[must_use]
pub fn error_line(error: Option<&str>) -> Line<'static> {
    match error {
        Some(e) => Line::from(Span::styled(format!("  {e}"), STYLE_ERROR)),
        None => Line::from(""),
    }
}

// =============================================================================
// TEXT FIELD
// =============================================================================

/// Single-line text input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    value: String,
}

impl TextField {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    /// Apply an editing key. Returns `true` if the key was consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.value.push(c);
                true
            }
            KeyCode::Backspace => {
                self.value.pop();
                true
            }
            _ => false,
        }
    }

    /// `label: value_` with the cursor shown when focused.
    #[must_use]
    pub fn line(&self, label: &str, focused: bool) -> Line<'static> {
        labeled_line(label, &self.value, focused, true)
    }
}

/// One form row. `editable` rows show a cursor when focused.
#[must_use]
pub fn labeled_line(label: &str, value: &str, focused: bool, editable: bool) -> Line<'static> {
    let marker = if focused { super::theme::SEL_LEFT } else { " " };
    let cursor = if focused && editable { "_" } else { "" };
    let value_style = if focused { STYLE_TEXT } else { STYLE_DIM };
    Line::from(vec![
        Span::styled(format!(" {marker} "), STYLE_KEY),
        Span::styled(format!("{label:<12}"), STYLE_LABEL),
        Span::styled(format!("{value}{cursor}"), value_style),
    ])
}

/// Move focus one field forward or back, wrapping around.
#[must_use]
pub fn cycle_focus(focus: usize, count: usize, forward: bool) -> usize {
    if count == 0 {
        return 0;
    }
    if forward {
        (focus + 1) % count
    } else {
        (focus + count - 1) % count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_text_field_editing() {
        let mut field = TextField::new();
        assert!(field.handle_key(&key(KeyCode::Char('a'))));
        assert!(field.handle_key(&key(KeyCode::Char('b'))));
        assert!(field.handle_key(&key(KeyCode::Backspace)));
        assert!(!field.handle_key(&key(KeyCode::Enter)));
        assert!(!field.handle_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert_eq!(field.value(), "a");
    }

    #[test]
    fn test_cycle_focus_wraps() {
        assert_eq!(cycle_focus(2, 3, true), 0);
        assert_eq!(cycle_focus(0, 3, false), 2);
        assert_eq!(cycle_focus(0, 0, true), 0);
    }

    #[test]
    fn test_scroll_offset_keeps_selection_visible() {
        assert_eq!(scroll_offset(0, 5), 0);
        assert_eq!(scroll_offset(4, 5), 0);
        assert_eq!(scroll_offset(9, 5), 5);
        assert_eq!(scroll_offset(3, 0), 3);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_for_display("short", 10), "short");
        assert_eq!(truncate_for_display("a-very-long-name", 8), "a-ver...");
    }
}
