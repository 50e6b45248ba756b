//! Advanced create form
//!
//! ```text
//!  ▶ Name        dev-box_
//!    Release     24.04
//!    CPUs        2            1..=host CPUs
//!    Memory MiB  4096         512..=75% of host memory
//!    Disk GB     20
//!    Network     en0
//!    Template    < web (repo) >
//! ```
//!
//! Empty optional fields mean "backend default". Everything is validated
//! before the launch is submitted; errors stay in the form.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{layout::Rect, text::Line, Frame};

use super::widgets::{
    centered_popup, cycle_focus, error_line, hint_line, labeled_line, render_popup, TextField,
};
use crate::app::message::{Operation, Request};
use crate::app::AppContext;
use crate::backend::LaunchRequest;
use crate::host::MIN_MEMORY_MB;

const NAME: usize = 0;
const RELEASE: usize = 1;
const CPUS: usize = 2;
const MEMORY: usize = 3;
const DISK: usize = 4;
const NETWORK: usize = 5;
const TEMPLATE: usize = 6;
const FIELD_COUNT: usize = 7;

const LABELS: [&str; FIELD_COUNT] =
    ["Name", "Release", "CPUs", "Memory MiB", "Disk GB", "Network", "Template"];

/// Instance and snapshot names: a letter, then letters, digits or hyphens.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    inputs: [TextField; TEMPLATE],
    /// Index into the context's templates; `None` for no cloud-init
    template: Option<usize>,
    focus: usize,
    error: Option<String>,
}

impl CreateForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn handle_key(&mut self, key: &KeyEvent, ctx: &AppContext) -> Option<Request> {
        match key.code {
            KeyCode::Esc => return Some(Request::BackToTable),
            KeyCode::Enter => match self.validate(ctx) {
                Ok(request) => return Some(Request::Submit(Operation::Launch(request))),
                Err(e) => self.error = Some(e),
            },
            KeyCode::Tab | KeyCode::Down => self.focus = cycle_focus(self.focus, FIELD_COUNT, true),
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = cycle_focus(self.focus, FIELD_COUNT, false);
            }
            KeyCode::Left | KeyCode::Right if self.focus == TEMPLATE => {
                self.template = cycle_template(
                    self.template,
                    ctx.templates.len(),
                    key.code == KeyCode::Right,
                );
            }
            _ => {
                if let Some(input) = self.inputs.get_mut(self.focus) {
                    if input.handle_key(key) {
                        self.error = None;
                    }
                }
            }
        }
        None
    }

    /// Build the launch request, or describe the first invalid field.
    ///
    /// # Errors
    /// Returns the message to show in the form.
    pub fn validate(&self, ctx: &AppContext) -> Result<LaunchRequest, String> {
        let name = self.inputs[NAME].trimmed();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if !is_valid_name(name) {
            return Err("Name must start with a letter and use only letters, digits and -".into());
        }
        if ctx.vm(name).is_some() || ctx.busy.is_busy(name) {
            return Err(format!("An instance named {name} already exists"));
        }

        let cpus = parse_optional::<u32>(self.inputs[CPUS].trimmed(), "CPUs")?;
        if let Some(n) = cpus {
            if n == 0 || n > ctx.host.cpus {
                return Err(format!("CPUs must be between 1 and {}", ctx.host.cpus));
            }
        }

        let memory_mb = parse_optional::<u64>(self.inputs[MEMORY].trimmed(), "Memory")?;
        if let Some(mb) = memory_mb {
            let max = ctx.host.max_memory_mb();
            if mb < MIN_MEMORY_MB || (max > 0 && mb > max) {
                return Err(format!("Memory must be between {MIN_MEMORY_MB} and {max} MiB"));
            }
        }

        let disk_gb = parse_optional::<u64>(self.inputs[DISK].trimmed(), "Disk")?;
        if disk_gb == Some(0) {
            return Err("Disk must be at least 1 GB".to_string());
        }

        let network = Some(self.inputs[NETWORK].trimmed()).filter(|n| !n.is_empty());

        Ok(LaunchRequest {
            name: name.to_string(),
            release: self.inputs[RELEASE].trimmed().to_string(),
            cpus,
            memory_mb,
            disk_gb,
            cloud_init: self.template.and_then(|i| ctx.templates.get(i)).map(|t| t.path.clone()),
            network: network.map(str::to_string),
        })
    }

    pub fn render(&self, f: &mut Frame, area: Rect, ctx: &AppContext) {
        let mut lines = vec![Line::from("")];
        for (idx, input) in self.inputs.iter().enumerate() {
            lines.push(input.line(LABELS[idx], self.focus == idx));
        }
        let template = self
            .template
            .and_then(|i| ctx.templates.get(i))
            .map_or_else(|| "none".to_string(), crate::templates::Template::label);
        lines.push(labeled_line(
            LABELS[TEMPLATE],
            &format!("< {template} >"),
            self.focus == TEMPLATE,
            false,
        ));
        lines.push(Line::from(""));
        lines.push(error_line(self.error.as_deref()));
        lines.push(hint_line(&[
            ("Tab", "next"),
            ("←→", "template"),
            ("Enter", "launch"),
            ("Esc", "cancel"),
        ]));

        let title = format!(
            "Create VM (host: {} CPUs, {} MiB max)",
            ctx.host.cpus,
            ctx.host.max_memory_mb()
        );
        render_popup(f, centered_popup(area, 60, 15), &title, lines);
    }
}

fn parse_optional<T: std::str::FromStr>(value: &str, label: &str) -> Result<Option<T>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| format!("{label} must be a whole number"))
}

/// Step through `None, 0, 1, .., count-1` and wrap.
fn cycle_template(current: Option<usize>, count: usize, forward: bool) -> Option<usize> {
    if count == 0 {
        return None;
    }
    match (current, forward) {
        (None, true) => Some(0),
        (None, false) => Some(count - 1),
        (Some(i), true) if i + 1 < count => Some(i + 1),
        (Some(i), false) if i > 0 => Some(i - 1),
        (Some(_), _) => None,
    }
}
