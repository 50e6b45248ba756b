//! Resource resize form
//!
//! Shows the VM's current `local.<vm>.{cpus,memory,disk}` settings and
//! submits only the values that changed. Limits: CPUs up to the host's
//! count, memory up to 75% of host memory, and the disk can only grow.

use crossterm::event::{KeyCode, KeyEvent};
use mpdeck_common::parse_size_bytes;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    Frame,
};

use super::theme::{STYLE_DIM, STYLE_ERROR};
use super::widgets::{centered_popup, cycle_focus, error_line, hint_line, render_popup, TextField};
use crate::app::message::{Operation, Request};
use crate::app::AppContext;
use crate::backend::{ResourceKey, ResourceSettings};
use crate::host::MIN_MEMORY_MB;

const LABELS: [&str; 3] = ["CPUs", "Memory", "Disk"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcesForm {
    vm: String,
    current: Option<Result<ResourceSettings, String>>,
    inputs: [TextField; 3],
    focus: usize,
    error: Option<String>,
}

impl ResourcesForm {
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

    /// Store the fetched settings and prefill the inputs with them.
    pub fn set_current(&mut self, result: Result<ResourceSettings, String>) {
        if let Ok(settings) = &result {
            for (input, key) in self.inputs.iter_mut().zip(ResourceKey::ALL) {
                *input = TextField::with_value(settings.value(key));
            }
        }
        self.current = Some(result);
    }

    pub fn handle_key(&mut self, key: &KeyEvent, ctx: &AppContext) -> Option<Request> {
        match key.code {
            KeyCode::Esc => return Some(Request::BackToTable),
            KeyCode::Tab | KeyCode::Down => self.focus = cycle_focus(self.focus, 3, true),
            KeyCode::BackTab | KeyCode::Up => self.focus = cycle_focus(self.focus, 3, false),
            KeyCode::Enter => match self.validate(ctx) {
                Ok(changes) => {
                    return Some(Request::Submit(Operation::SetResources {
                        vm: self.vm.clone(),
                        changes,
                    }))
                }
                Err(e) => self.error = Some(e),
            },
            _ => {
                if self.inputs[self.focus].handle_key(key) {
                    self.error = None;
                }
            }
        }
        None
    }

    /// Changed settings, in cpus/memory/disk order.
    ///
    /// # Errors
    /// Returns the message to show in the form.
    pub fn validate(&self, ctx: &AppContext) -> Result<Vec<(ResourceKey, String)>, String> {
        let Some(Ok(current)) = &self.current else {
            return Err("Current settings are not loaded yet".to_string());
        };

        let mut changes = Vec::new();
        for (input, key) in self.inputs.iter().zip(ResourceKey::ALL) {
            let value = input.trimmed();
            if value == current.value(key) {
                continue;
            }
            match key {
                ResourceKey::Cpus => check_cpus(value, ctx.host.cpus)?,
                ResourceKey::Memory => check_memory(value, ctx.host.max_memory_mb())?,
                ResourceKey::Disk => check_disk(value, &current.disk)?,
            }
            changes.push((key, value.to_string()));
        }

        if changes.is_empty() {
            return Err("Nothing changed".to_string());
        }
        Ok(changes)
    }

    pub fn render(&self, f: &mut Frame, area: Rect, ctx: &AppContext) {
        let mut lines = vec![Line::from("")];
        match &self.current {
            None => lines.push(Line::from(Span::styled("  loading...", STYLE_DIM))),
            Some(Err(e)) => lines.push(Line::from(Span::styled(format!("  {e}"), STYLE_ERROR))),
            Some(Ok(_)) => {
                for (idx, input) in self.inputs.iter().enumerate() {
                    lines.push(input.line(LABELS[idx], self.focus == idx));
                }
                lines.push(Line::from(Span::styled(
                    format!(
                        "  host: {} CPUs, up to {} MiB per VM; the VM must be stopped",
                        ctx.host.cpus,
                        ctx.host.max_memory_mb()
                    ),
                    STYLE_DIM,
                )));
            }
        }
        lines.push(error_line(self.error.as_deref()));
        lines.push(hint_line(&[("Tab", "next"), ("Enter", "apply"), ("Esc", "cancel")]));
        render_popup(f, centered_popup(area, 60, 10), &format!("Resources: {}", self.vm), lines);
    }
}

fn check_cpus(value: &str, host_cpus: u32) -> Result<(), String> {
    match value.parse::<u32>() {
        Ok(n) if n >= 1 && n <= host_cpus => Ok(()),
        _ => Err(format!("CPUs must be a whole number between 1 and {host_cpus}")),
    }
}

fn check_memory(value: &str, max_mb: u64) -> Result<(), String> {
    let Some(bytes) = parse_size_bytes(value) else {
        return Err(format!("Can't read memory size {value:?} (try 4G or 2048M)"));
    };
    let mb = bytes >> 20;
    if mb < MIN_MEMORY_MB || (max_mb > 0 && mb > max_mb) {
        return Err(format!("Memory must be between {MIN_MEMORY_MB} and {max_mb} MiB"));
    }
    Ok(())
}

fn check_disk(value: &str, current: &str) -> Result<(), String> {
    let Some(bytes) = parse_size_bytes(value) else {
        return Err(format!("Can't read disk size {value:?} (try 20G)"));
    };
    match parse_size_bytes(current) {
        Some(existing) if bytes < existing => {
            Err(format!("Disk can only grow (currently {current})"))
        }
        _ => Ok(()),
    }
}
