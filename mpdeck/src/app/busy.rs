//! Busy-operation tracker
//!
//! One descriptor per VM while an operation on it is in flight. The backend
//! gives no incremental feedback, so the UI derives a coarse phase and an
//! asymptotic progress estimate from elapsed time alone:
//!
//! ```text
//! elapsed   0s        3s             8s             15s
//!           │ Stopping… │ working on it │ almost there │ hang tight
//! progress  0 ─────────────────────────────────────────────▶ 0.95 (never reached)
//! ```
//!
//! Completion is signalled only by [`BusyTracker::end`], never by the
//! estimate reaching its ceiling, and never by a timeout.

#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::domain::BusyKind;

const PROGRESS_CEILING: f64 = 0.95;
const PROGRESS_HALF_LIFE_SECS: f64 = 5.0;

/// An in-flight operation on one VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyOp {
    pub kind: BusyKind,
    pub started: Instant,
}

impl BusyOp {
    #[must_use]
    pub fn phase_at(&self, now: Instant) -> String {
        phase_for(self.kind, now.saturating_duration_since(self.started))
    }

    #[must_use]
    pub fn progress_at(&self, now: Instant) -> f64 {
        progress_for(now.saturating_duration_since(self.started))
    }
}

/// VM name → in-flight operation.
#[derive(Debug, Default)]
pub struct BusyTracker {
    ops: HashMap<String, BusyOp>,
}

impl BusyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `entity` busy with `kind`.
    ///
    /// Returns `false` and leaves the existing descriptor untouched if the
    /// entity is already busy; callers reject the second operation.
    pub fn begin(&mut self, entity: &str, kind: BusyKind) -> bool {
        self.begin_at(entity, kind, Instant::now())
    }

    pub fn begin_at(&mut self, entity: &str, kind: BusyKind, now: Instant) -> bool {
        if self.ops.contains_key(entity) {
            return false;
        }
        self.ops.insert(entity.to_string(), BusyOp { kind, started: now });
        true
    }

    /// Clear `entity`. A no-op when it isn't busy.
    pub fn end(&mut self, entity: &str) -> Option<BusyOp> {
        self.ops.remove(entity)
    }

    #[must_use]
    pub fn get(&self, entity: &str) -> Option<&BusyOp> {
        self.ops.get(entity)
    }

    #[must_use]
    pub fn is_busy(&self, entity: &str) -> bool {
        self.ops.contains_key(entity)
    }

    #[must_use]
    pub fn phase(&self, entity: &str) -> Option<String> {
        self.get(entity).map(|op| op.phase_at(Instant::now()))
    }

    #[must_use]
    pub fn progress(&self, entity: &str) -> Option<f64> {
        self.get(entity).map(|op| op.progress_at(Instant::now()))
    }

    /// Busy entities of `kind`, in no particular order.
    pub fn entities_of(&self, kind: BusyKind) -> impl Iterator<Item = &str> {
        self.ops.iter().filter(move |(_, op)| op.kind == kind).map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Coarse phase text for an operation of `kind` running for `elapsed`.
#[must_use]
pub fn phase_for(kind: BusyKind, elapsed: Duration) -> String {
    match elapsed.as_secs_f64() {
        s if s < 3.0 => format!("{}...", kind.verb()),
        s if s < 8.0 => "working on it".to_string(),
        s if s < 15.0 => "almost there".to_string(),
        _ => "hang tight".to_string(),
    }
}

/// `0.95 × (1 − 1/(1 + elapsed/5))`: 0 at start, 0.475 at 5s, always < 0.95.
#[must_use]
pub fn progress_for(elapsed: Duration) -> f64 {
    let t = elapsed.as_secs_f64() / PROGRESS_HALF_LIFE_SECS;
    PROGRESS_CEILING * (1.0 - 1.0 / (1.0 + t))
}
