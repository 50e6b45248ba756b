//! TUI color theme
//!
//! Console-green palette shared by every view

use mpdeck_common::LifecycleState;
use ratatui::style::{Color, Modifier, Style};

pub const DECK_GREEN: Color = Color::Rgb(80, 220, 120);
pub const ALERT_RED: Color = Color::Rgb(240, 70, 70);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const INFO_DIM: Color = Color::Rgb(110, 150, 120);
pub const DECK_CYAN: Color = Color::Rgb(90, 200, 230);
pub const BACKGROUND: Color = Color::Black;

pub const STYLE_HEADING: Style = Style::new().fg(DECK_GREEN).add_modifier(Modifier::BOLD);
pub const STYLE_LABEL: Style = Style::new().fg(CAUTION_AMBER).add_modifier(Modifier::BOLD);
pub const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
pub const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);
pub const STYLE_TEXT: Style = Style::new().fg(Color::White);
pub const STYLE_ERROR: Style = Style::new().fg(ALERT_RED).add_modifier(Modifier::BOLD);
pub const STYLE_POPUP: Style = Style::new().bg(BACKGROUND).fg(DECK_GREEN);

/// Selection marker for the focused row or field
pub const SEL_LEFT: &str = "▶";

#[must_use]
pub fn state_color(state: LifecycleState) -> Color {
    match state {
        LifecycleState::Running => DECK_GREEN,
        LifecycleState::Suspended => DECK_CYAN,
        LifecycleState::Stopped => INFO_DIM,
        LifecycleState::Deleted => ALERT_RED,
        LifecycleState::Unknown => CAUTION_AMBER,
    }
}

/// Text gauge like `[█████░░░░░]` for a fraction in `0.0..=1.0`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn gauge_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_bar() {
        assert_eq!(gauge_bar(0.0, 4), "[░░░░]");
        assert_eq!(gauge_bar(0.5, 4), "[██░░]");
        assert_eq!(gauge_bar(2.0, 4), "[████]");
    }
}
