//! Shared application context
//!
//! The single authoritative copy of everything several views read: the VM
//! collection, the busy tracker, host capacity and templates. Owned by the
//! coordinator and lent to views by reference.

use log::warn;
use mpdeck_common::VmSummary;

use super::busy::BusyTracker;
use super::message::Command;
use crate::config::AppConfig;
use crate::domain::FetchOrigin;
use crate::host::HostCapacity;
use crate::templates::Template;

/// One-line message shown in the status bar until replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

#[derive(Debug)]
pub struct AppContext {
    /// Last applied VM list, replaced wholesale on every fetch
    pub vms: Vec<VmSummary>,
    pub busy: BusyTracker,
    pub host: HostCapacity,
    pub templates: Vec<Template>,
    pub config: AppConfig,
    pub notice: Option<Notice>,
    /// Error of the most recent background refresh, cleared by the next success
    pub last_refresh_error: Option<String>,
    /// True until the first VM list has been applied
    pub loading: bool,
    next_seq: u64,
    applied_seq: u64,
    background_in_flight: bool,
}

impl AppContext {
    #[must_use]
    pub fn new(host: HostCapacity, config: AppConfig) -> Self {
        Self {
            vms: Vec::new(),
            busy: BusyTracker::new(),
            host,
            templates: Vec::new(),
            config,
            notice: None,
            last_refresh_error: None,
            loading: true,
            next_seq: 0,
            applied_seq: 0,
            background_in_flight: false,
        }
    }

    #[must_use]
    pub fn vm(&self, name: &str) -> Option<&VmSummary> {
        self.vms.iter().find(|vm| vm.name == name)
    }

    /// Next VM-list fetch to dispatch. Background fetches are skipped while
    /// one is still in flight.
    pub fn next_fetch(&mut self, origin: FetchOrigin) -> Option<Command> {
        if origin == FetchOrigin::Background {
            if self.background_in_flight {
                return None;
            }
            self.background_in_flight = true;
        }
        self.next_seq += 1;
        Some(Command::FetchVms { origin, seq: self.next_seq })
    }

    /// Sequence number of the most recently issued fetch.
    #[must_use]
    pub fn last_issued_seq(&self) -> u64 {
        self.next_seq
    }

    /// Apply a VM-list result. Returns `false` if it was older than the last
    /// applied result and therefore dropped.
    pub fn apply_vms(
        &mut self,
        origin: FetchOrigin,
        seq: u64,
        result: Result<Vec<VmSummary>, String>,
    ) -> bool {
        if origin == FetchOrigin::Background {
            self.background_in_flight = false;
        }
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;

        match result {
            Ok(vms) => {
                self.vms = vms;
                self.loading = false;
                self.last_refresh_error = None;
            }
            Err(e) => {
                if self.last_refresh_error.as_deref() != Some(e.as_str()) {
                    warn!("VM refresh failed: {e}");
                }
                self.last_refresh_error = Some(e);
            }
        }
        true
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }
}
