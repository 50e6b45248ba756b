//! VM detail view: the `info` block as a two-column list

use crossterm::event::{KeyCode, KeyEvent};
use mpdeck_common::InfoBlock;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    Frame,
};

use super::theme::{STYLE_DIM, STYLE_ERROR, STYLE_LABEL, STYLE_TEXT};
use super::widgets::{centered_popup, hint_line, render_popup};
use crate::app::message::Request;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoView {
    vm: String,
    details: Option<Result<InfoBlock, String>>,
    scroll: usize,
}

impl InfoView {
    #[must_use]
    pub fn new(vm: impl Into<String>) -> Self {
        Self { vm: vm.into(), details: None, scroll: 0 }
    }

    #[must_use]
    pub fn vm(&self) -> &str {
        &self.vm
    }

    pub fn set_details(&mut self, result: Result<InfoBlock, String>) {
        self.details = Some(result);
        self.scroll = 0;
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<Request> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll += 1,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q' | 'i') => {
                return Some(Request::BackToTable)
            }
            _ => {}
        }
        None
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let block = match &self.details {
            None => return vec![Line::from(Span::styled("  loading...", STYLE_DIM))],
            Some(Err(e)) => return vec![Line::from(Span::styled(format!("  {e}"), STYLE_ERROR))],
            Some(Ok(block)) => block,
        };

        let width = block.fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut lines = Vec::new();
        for (key, value) in &block.fields {
            let mut values = value.lines();
            lines.push(Line::from(vec![
                Span::styled(format!("  {key:<width$}  "), STYLE_LABEL),
                Span::styled(values.next().unwrap_or_default().to_string(), STYLE_TEXT),
            ]));
            for continuation in values {
                lines.push(Line::from(vec![
                    Span::raw(format!("  {:<width$}  ", "")),
                    Span::styled(continuation.to_string(), STYLE_TEXT),
                ]));
            }
        }
        lines
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let popup = centered_popup(area, 80, area.height.saturating_sub(4).max(6));
        let visible = usize::from(popup.height.saturating_sub(4));

        let all = self.lines();
        let scroll = self.scroll.min(all.len().saturating_sub(visible));
        let mut lines = vec![Line::from("")];
        lines.extend(all.into_iter().skip(scroll).take(visible));
        lines.push(hint_line(&[("↑↓", "scroll"), ("Esc", "back")]));

        render_popup(f, popup, &format!("Info: {}", self.vm), lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn test_multiline_values_continue_in_value_column() {
        let mut view = InfoView::new("vm1");
        view.set_details(Ok(InfoBlock {
            fields: vec![
                ("Name".into(), "vm1".into()),
                ("Mounts".into(), "/a => /b\n/c => /d".into()),
            ],
        }));
        assert_eq!(view.lines().len(), 3);
    }

    #[test]
    fn test_escape_returns_to_table() {
        let mut view = InfoView::new("vm1");
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(view.handle_key(&esc), Some(Request::BackToTable));
    }
}
