//! # Session Coordinator
//!
//! A single-threaded state machine that owns every piece of UI state. All
//! input arrives as a [`Message`]; [`App::update`] applies it and returns the
//! [`Effect`]s the run loop should perform.
//!
//! ```text
//!                ┌──────────── Key ─────────────┐
//!                │                              ▼
//!  terminal ─────┤                      ┌──────────────┐   Dispatch(Command)
//!                │   Tick               │  App::update │──────────────────────▶ Dispatcher
//!  refresh timer ┼─────────────────────▶│              │                          │
//!                │   VmsFetched,        │  view: View  │◀──── result Message ─────┘
//!                │   OpFinished, ...    │  ctx, table  │
//!                └──────────────────────└──────────────┘
//! ```
//!
//! ## Rules
//!
//! - Exactly one [`View`] is active. Views never talk to each other; they
//!   hand a [`Request`] back to the coordinator.
//! - Background refresh results replace the VM collection but never change
//!   the active view.
//! - Inline operations (start/stop/suspend/recover) keep the user on the
//!   table. Other operations pass through a loading view and only leave it
//!   when their result arrives.
//! - An operation on a VM that already has one in flight is rejected with a
//!   notice.

pub mod busy;
pub mod context;
pub mod dispatch;
pub mod message;
pub mod refresh;

pub use context::{AppContext, Notice};
pub use dispatch::{Dispatcher, Executor};
pub use message::{Command, Effect, Message, OpResult, Operation, Request};
pub use refresh::RefreshScheduler;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info};
use mpdeck_common::{LifecycleState, VmSummary};

use crate::domain::FetchOrigin;
use crate::tui::create::CreateForm;
use crate::tui::dialogs::{ConfirmView, ErrorView, LoadingView, ReturnTo, VersionView};
use crate::tui::info::InfoView;
use crate::tui::mounts::{MountForm, MountManager};
use crate::tui::resources::ResourcesForm;
use crate::tui::snapshots::{SnapshotForm, SnapshotManager};
use crate::tui::table::TableView;

// =============================================================================
// VIEWS
// =============================================================================

/// The active view and its transient state.
#[derive(Debug)]
pub enum View {
    Table,
    Help,
    Version(VersionView),
    Info(InfoView),
    Loading(LoadingView),
    Error(ErrorView),
    Confirm(ConfirmView),
    Create(CreateForm),
    SnapshotCreate(SnapshotForm),
    SnapshotManage(SnapshotManager),
    MountManage(MountManager),
    MountAdd(MountForm),
    MountModify(MountForm),
    Resources(ResourcesForm),
}

impl View {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Help => "help",
            Self::Version(_) => "version",
            Self::Info(_) => "info",
            Self::Loading(_) => "loading",
            Self::Error(_) => "error",
            Self::Confirm(_) => "confirm",
            Self::Create(_) => "create",
            Self::SnapshotCreate(_) => "snapshot-create",
            Self::SnapshotManage(_) => "snapshots",
            Self::MountManage(_) => "mounts",
            Self::MountAdd(_) => "mount-add",
            Self::MountModify(_) => "mount-modify",
            Self::Resources(_) => "resources",
        }
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

pub struct App {
    ctx: AppContext,
    /// Table state outlives view switches (filter, sort, selection)
    table: TableView,
    view: View,
    should_quit: bool,
}

impl App {
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx, table: TableView::new(), view: View::Table, should_quit: false }
    }

    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    #[must_use]
    pub fn view(&self) -> &View {
        &self.view
    }

    #[must_use]
    pub fn table(&self) -> &TableView {
        &self.table
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Effects to perform once at startup: the first fetch, template
    /// discovery and the refresh timer.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.fetch(FetchOrigin::Background, &mut effects);
        effects.push(Effect::Dispatch(Command::LoadTemplates));
        effects.push(Effect::ArmRefresh);
        effects
    }

    /// Apply one message.
    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        let mut effects = Vec::new();
        match message {
            Message::Key(key) => self.handle_key(&key, &mut effects),
            Message::Tick => self.on_tick(&mut effects),
            Message::VmsFetched { origin, seq, result } => self.on_vms(origin, seq, result),
            Message::OpFinished(result) => self.on_op_finished(result, &mut effects),
            Message::InfoFetched { vm, result } => {
                if let View::Info(view) = &mut self.view {
                    if view.vm() == vm {
                        view.set_details(result);
                    }
                }
            }
            Message::SnapshotsFetched { vm, result } => {
                if let View::SnapshotManage(view) = &mut self.view {
                    if view.vm() == vm {
                        view.set_snapshots(result);
                    }
                }
            }
            Message::MountsFetched { vm, result } => {
                if let View::MountManage(view) = &mut self.view {
                    if view.vm() == vm {
                        view.set_mounts(result);
                    }
                }
            }
            Message::ResourcesFetched { vm, result } => {
                if let View::Resources(view) = &mut self.view {
                    if view.vm() == vm {
                        view.set_current(result);
                    }
                }
            }
            Message::VersionFetched(result) => {
                if let View::Version(view) = &mut self.view {
                    view.set_backend(result);
                }
            }
            Message::TemplatesLoaded(templates) => {
                info!("{} cloud-init templates available", templates.len());
                self.ctx.templates = templates;
            }
            Message::Yanked { vm, text, result } => {
                let notice = match result {
                    Ok(()) => Notice::info(format!("Copied {text} ({vm})")),
                    Err(e) => Notice::error(format!("Clipboard unavailable: {e}")),
                };
                self.ctx.set_notice(notice);
            }
            Message::Request(request) => self.handle_request(request, &mut effects),
        }
        effects
    }

    // =========================================================================
    // Input
    // =========================================================================

    fn handle_key(&mut self, key: &KeyEvent, effects: &mut Vec<Effect>) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit(effects);
            return;
        }
        if matches!(self.view, View::Table) {
            self.handle_table_key(key, effects);
            return;
        }

        let ctx = &self.ctx;
        let request = match &mut self.view {
            View::Table => None,
            View::Help => Some(Request::BackToTable),
            View::Version(view) => view.handle_key(key),
            View::Info(view) => view.handle_key(key),
            View::Loading(view) => view.handle_key(key),
            View::Error(view) => view.handle_key(key),
            View::Confirm(view) => view.handle_key(key),
            View::Create(view) => view.handle_key(key, ctx),
            View::SnapshotCreate(view) => view.handle_key(key),
            View::SnapshotManage(view) => view.handle_key(key),
            View::MountManage(view) => view.handle_key(key),
            View::MountAdd(view) | View::MountModify(view) => view.handle_key(key),
            View::Resources(view) => view.handle_key(key, ctx),
        };

        if let Some(request) = request {
            self.handle_request(request, effects);
        }
    }

    fn handle_table_key(&mut self, key: &KeyEvent, effects: &mut Vec<Effect>) {
        if self.table.is_editing_filter() {
            self.table.handle_filter_key(key, &self.ctx);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.quit(effects),
            KeyCode::Char('?') => self.view = View::Help,
            KeyCode::Up | KeyCode::Char('k') => self.table.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.table.scroll_down(),
            KeyCode::Home | KeyCode::Char('g') => self.table.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.table.select_last(),
            KeyCode::Char('/') => self.table.start_filter(),
            KeyCode::Char('o') => self.table.cycle_sort(&self.ctx),
            KeyCode::Char('r') => {
                self.fetch(FetchOrigin::Foreground, effects);
                self.ctx.set_notice(Notice::info("Refreshing..."));
            }
            KeyCode::Char('v') => {
                self.view = View::Version(VersionView::new());
                effects.push(Effect::Dispatch(Command::FetchVersion));
            }
            KeyCode::Char('c') => self.view = View::Create(CreateForm::new()),
            KeyCode::Char('P') => self.view = View::Confirm(ConfirmView::new(Operation::PurgeAll)),
            KeyCode::Char('s') => {
                self.with_selected(|vm| Request::Submit(Operation::Start(vm)), effects);
            }
            KeyCode::Char('S') => {
                self.with_selected(|vm| Request::Submit(Operation::Stop(vm)), effects);
            }
            KeyCode::Char('u') => {
                self.with_selected(|vm| Request::Submit(Operation::Suspend(vm)), effects);
            }
            KeyCode::Char('R') => {
                self.with_selected(|vm| Request::Submit(Operation::Recover(vm)), effects);
            }
            KeyCode::Char('d') => {
                let purge =
                    self.table.selected_vm().is_some_and(|vm| vm.state == LifecycleState::Deleted);
                self.with_selected(|vm| Request::Confirm(Operation::Delete { vm, purge }), effects);
            }
            KeyCode::Char('n') => self.with_selected(|vm| Request::SnapshotManage { vm }, effects),
            KeyCode::Char('m') => self.with_selected(|vm| Request::MountManage { vm }, effects),
            KeyCode::Enter | KeyCode::Char('i') => {
                if let Some(vm) = self.selected_vm_name() {
                    self.view = View::Info(InfoView::new(vm.clone()));
                    effects.push(Effect::Dispatch(Command::FetchInfo(vm)));
                }
            }
            KeyCode::Char('e') => {
                if let Some(vm) = self.selected_vm_name() {
                    self.view = View::Resources(ResourcesForm::new(vm.clone()));
                    effects.push(Effect::Dispatch(Command::FetchResources(vm)));
                }
            }
            KeyCode::Char('y') => self.yank(effects),
            _ => {}
        }
    }

    /// Name of the selected VM, or `None` (with a notice) when nothing the
    /// backend knows about is selected.
    fn selected_vm_name(&mut self) -> Option<String> {
        if let Some(vm) = self.table.selected_vm() {
            return Some(vm.name.clone());
        }
        if let Some(name) = self.table.selected_name() {
            let notice = Notice::error(format!("{name} is still being created"));
            self.ctx.set_notice(notice);
        }
        None
    }

    fn with_selected(&mut self, make: impl FnOnce(String) -> Request, effects: &mut Vec<Effect>) {
        if let Some(vm) = self.selected_vm_name() {
            self.handle_request(make(vm), effects);
        }
    }

    fn yank(&mut self, effects: &mut Vec<Effect>) {
        let Some(vm) = self.table.selected_vm() else {
            return;
        };
        match vm.primary_ipv4() {
            Some(ip) => {
                effects.push(Effect::Yank { vm: vm.name.clone(), text: ip.to_string() });
            }
            None => {
                let notice = Notice::error(format!("{} has no IPv4 address", vm.name));
                self.ctx.set_notice(notice);
            }
        }
    }

    fn quit(&mut self, effects: &mut Vec<Effect>) {
        self.should_quit = true;
        effects.push(Effect::Quit);
    }

    // =========================================================================
    // Requests
    // =========================================================================

    fn handle_request(&mut self, request: Request, effects: &mut Vec<Effect>) {
        debug!("request {request:?} from {} view", self.view.name());
        match request {
            Request::BackToTable => self.view = View::Table,
            Request::Submit(op) => self.submit(op, effects),
            Request::Confirm(op) => self.view = View::Confirm(ConfirmView::new(op)),
            Request::SnapshotManage { vm } => {
                self.view = View::SnapshotManage(SnapshotManager::new(vm.clone()));
                effects.push(Effect::Dispatch(Command::FetchSnapshots(vm)));
            }
            Request::SnapshotCreate { vm } => {
                self.view = View::SnapshotCreate(SnapshotForm::new(vm));
            }
            Request::MountManage { vm } => {
                self.view = View::MountManage(MountManager::new(vm.clone()));
                effects.push(Effect::Dispatch(Command::FetchMounts(vm)));
            }
            Request::MountAdd { vm } => self.view = View::MountAdd(MountForm::add(vm)),
            Request::MountModify { vm, mount } => {
                self.view = View::MountModify(MountForm::modify(vm, mount));
            }
        }
    }

    /// Start `op`: inline operations stay on the current view, the others
    /// move to a loading view until their result arrives.
    fn submit(&mut self, op: Operation, effects: &mut Vec<Effect>) {
        if !self.mark_busy(&op) {
            // A rejected confirm must not stay on screen waiting for input
            if let View::Confirm(confirm) = &self.view {
                let back = confirm.cancel_request();
                self.handle_request(back, effects);
            }
            return;
        }

        if !op.kind().is_inline() {
            let return_to = match &op {
                Operation::SnapshotCreate { vm, .. }
                | Operation::SnapshotRestore { vm, .. }
                | Operation::SnapshotDelete { vm, .. } => ReturnTo::Snapshots(vm.clone()),
                Operation::Mount { vm, .. }
                | Operation::Umount { vm, .. }
                | Operation::ModifyMount { vm, .. } => ReturnTo::Mounts(vm.clone()),
                _ => ReturnTo::Table,
            };
            let entity = op.entity().map(str::to_string);
            self.view = View::Loading(LoadingView::new(op.kind(), entity, return_to));
        }

        effects.push(Effect::Dispatch(Command::Run(op)));
    }

    /// Record the busy descriptor for `op`. Returns `false` (and leaves a
    /// notice) if its VM already has an operation in flight.
    fn mark_busy(&mut self, op: &Operation) -> bool {
        let Some(entity) = op.entity() else {
            return true;
        };
        if let Some(current) = self.ctx.busy.get(entity) {
            let notice = Notice::error(format!(
                "{entity} is busy ({}), wait for it to finish",
                current.kind.verb().to_lowercase()
            ));
            self.ctx.set_notice(notice);
            return false;
        }
        if let Some(kind) = op.kind().busy_kind() {
            self.ctx.busy.begin(entity, kind);
            self.table.sync(&self.ctx);
        }
        true
    }

    // =========================================================================
    // Results
    // =========================================================================

    fn on_tick(&mut self, effects: &mut Vec<Effect>) {
        if self.should_quit {
            return;
        }
        self.fetch(FetchOrigin::Background, effects);
        effects.push(Effect::ArmRefresh);
    }

    /// Queue a VM-list fetch. Returns its sequence number, or `None` when a
    /// background fetch is already in flight.
    fn fetch(&mut self, origin: FetchOrigin, effects: &mut Vec<Effect>) -> Option<u64> {
        let command = self.ctx.next_fetch(origin)?;
        let seq = self.ctx.last_issued_seq();
        effects.push(Effect::Dispatch(command));
        Some(seq)
    }

    fn on_vms(&mut self, origin: FetchOrigin, seq: u64, result: Result<Vec<VmSummary>, String>) {
        let error = result.as_ref().err().cloned();
        if self.ctx.apply_vms(origin, seq, result) {
            self.table.sync(&self.ctx);
            if let (FetchOrigin::Foreground, Some(e)) = (origin, error) {
                self.ctx.set_notice(Notice::error(format!("Refresh failed: {e}")));
            }
        }

        if origin == FetchOrigin::Background {
            return;
        }
        if let View::Loading(loading) = &self.view {
            if loading.awaiting_refresh.is_some_and(|awaited| seq >= awaited) {
                self.view = View::Table;
            }
        }
    }

    fn on_op_finished(&mut self, result: OpResult, effects: &mut Vec<Effect>) {
        let OpResult { entity, kind, error } = result;
        let subject = match &entity {
            Some(vm) => format!("{kind} {vm}"),
            None => kind.to_string(),
        };

        if let (Some(vm), Some(_)) = (&entity, kind.busy_kind()) {
            self.ctx.busy.end(vm);
            self.table.sync(&self.ctx);
        }

        if kind.is_inline() {
            let notice = match &error {
                Some(e) => Notice::error(format!("{subject} failed: {e}")),
                None => {
                    let vm = entity.as_deref().unwrap_or_default();
                    Notice::info(format!("{vm}: {}", kind.done_label()))
                }
            };
            self.ctx.set_notice(notice);
            self.fetch(FetchOrigin::Foreground, effects);
            return;
        }

        let waiting_here =
            matches!(&self.view, View::Loading(l) if l.is_for(kind, entity.as_deref()));

        if let Some(e) = error {
            if waiting_here || matches!(self.view, View::Table) {
                self.view = View::Error(ErrorView::new(format!("{subject} failed"), e));
            } else {
                self.ctx.set_notice(Notice::error(format!("{subject} failed: {e}")));
            }
            return;
        }

        let done = match &entity {
            Some(vm) => format!("{vm}: {}", kind.done_label()),
            None => kind.done_label().to_string(),
        };
        self.ctx.set_notice(Notice::info(done));

        let seq = self.fetch(FetchOrigin::Foreground, effects);
        if !waiting_here {
            return;
        }
        let return_to = match &mut self.view {
            View::Loading(loading) => {
                if loading.return_to == ReturnTo::Table {
                    loading.awaiting_refresh = seq;
                }
                loading.return_to.clone()
            }
            _ => return,
        };
        match return_to {
            ReturnTo::Table => {}
            ReturnTo::Snapshots(vm) => self.handle_request(Request::SnapshotManage { vm }, effects),
            ReturnTo::Mounts(vm) => self.handle_request(Request::MountManage { vm }, effects),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LaunchRequest;
    use crate::config::AppConfig;
    use crate::domain::{BusyKind, OpKind};
    use crate::host::HostCapacity;

    fn app() -> App {
        App::new(AppContext::new(HostCapacity { cpus: 4, memory_mb: 8192 }, AppConfig::default()))
    }

    fn vm(name: &str, state: LifecycleState) -> VmSummary {
        VmSummary {
            name: name.into(),
            state,
            ipv4: vec!["10.0.0.2".into()],
            ..VmSummary::default()
        }
    }

    fn press(app: &mut App, code: KeyCode) -> Vec<Effect> {
        app.update(Message::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn with_vms(app: &mut App, vms: Vec<VmSummary>) {
        let seq = app.fetch(FetchOrigin::Foreground, &mut Vec::new()).unwrap();
        app.update(Message::VmsFetched { origin: FetchOrigin::Foreground, seq, result: Ok(vms) });
    }

    fn finished(entity: &str, kind: OpKind, error: Option<&str>) -> Message {
        Message::OpFinished(OpResult {
            entity: Some(entity.into()),
            kind,
            error: error.map(str::to_string),
        })
    }

    #[test]
    fn test_startup_effects() {
        let mut app = app();
        let effects = app.start();
        assert_eq!(
            effects,
            vec![
                Effect::Dispatch(Command::FetchVms { origin: FetchOrigin::Background, seq: 1 }),
                Effect::Dispatch(Command::LoadTemplates),
                Effect::ArmRefresh,
            ]
        );
        assert!(matches!(app.view(), View::Table));
    }

    #[test]
    fn test_busy_vm_rejects_second_operation() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);

        let effects = press(&mut app, KeyCode::Char('S'));
        assert_eq!(effects, vec![Effect::Dispatch(Command::Run(Operation::Stop("vm1".into())))]);

        assert!(press(&mut app, KeyCode::Char('u')).is_empty());
        assert_eq!(app.context().busy.get("vm1").unwrap().kind, BusyKind::Stopping);
        assert!(app.context().notice.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_inline_success_refreshes_in_foreground() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Stopped)]);
        press(&mut app, KeyCode::Char('s'));

        let effects = app.update(finished("vm1", OpKind::Start, None));
        assert!(matches!(
            effects.as_slice(),
            [Effect::Dispatch(Command::FetchVms { origin: FetchOrigin::Foreground, .. })]
        ));
        assert!(!app.context().busy.is_busy("vm1"));
        assert!(matches!(app.view(), View::Table));
    }

    #[test]
    fn test_delete_goes_through_confirm_and_loading() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);

        assert!(press(&mut app, KeyCode::Char('d')).is_empty());
        assert!(matches!(app.view(), View::Confirm(_)));

        let effects = press(&mut app, KeyCode::Char('y'));
        assert_eq!(
            effects,
            vec![Effect::Dispatch(Command::Run(Operation::Delete {
                vm: "vm1".into(),
                purge: false
            }))]
        );
        assert!(matches!(app.view(), View::Loading(_)));
        assert_eq!(app.context().busy.get("vm1").unwrap().kind, BusyKind::Deleting);

        // Success waits for the foreground refresh before returning
        let effects = app.update(finished("vm1", OpKind::Delete, None));
        let [Effect::Dispatch(Command::FetchVms { origin: FetchOrigin::Foreground, seq })] =
            effects.as_slice()
        else {
            panic!("expected one foreground fetch, got {effects:?}");
        };
        assert!(matches!(app.view(), View::Loading(_)));

        // A background result doesn't complete the transition
        app.update(Message::VmsFetched {
            origin: FetchOrigin::Background,
            seq: seq + 1,
            result: Ok(vec![]),
        });
        assert!(matches!(app.view(), View::Loading(_)));

        // The awaited result does, even though it is now stale for data
        app.update(Message::VmsFetched {
            origin: FetchOrigin::Foreground,
            seq: *seq,
            result: Ok(vec![vm("vm1", LifecycleState::Deleted)]),
        });
        assert!(matches!(app.view(), View::Table));
        assert!(app.context().vms.is_empty());
    }

    #[test]
    fn test_navigating_failure_opens_error_view() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Enter);

        app.update(finished("vm1", OpKind::Delete, Some("instance \"vm1\" is busy")));
        let View::Error(error) = app.view() else {
            panic!("expected error view");
        };
        assert_eq!(error.message, "instance \"vm1\" is busy");
        assert!(!app.context().busy.is_busy("vm1"));

        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.view(), View::Table));
    }

    #[test]
    fn test_snapshot_success_returns_to_manager() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Stopped)]);
        press(&mut app, KeyCode::Char('n'));
        assert!(matches!(app.view(), View::SnapshotManage(_)));

        press(&mut app, KeyCode::Char('c'));
        for c in "s1".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.view(), View::Loading(_)));

        let effects = app.update(finished("vm1", OpKind::SnapshotCreate, None));
        assert!(effects.contains(&Effect::Dispatch(Command::FetchSnapshots("vm1".into()))));
        let View::SnapshotManage(manager) = app.view() else {
            panic!("expected snapshot manager");
        };
        assert_eq!(manager.vm(), "vm1");
    }

    #[test]
    fn test_hidden_loading_still_reports_failure() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        press(&mut app, KeyCode::Char('c'));
        for c in "fresh".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        let effects = press(&mut app, KeyCode::Enter);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Dispatch(Command::Run(Operation::Launch(LaunchRequest { .. })))]
        ));
        assert_eq!(app.table().rows().len(), 2);

        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.view(), View::Table));
        assert!(app.context().busy.is_busy("fresh"));

        app.update(finished("fresh", OpKind::Launch, Some("image not found")));
        assert!(matches!(app.view(), View::Error(_)));
        assert_eq!(app.table().rows().len(), 1);
    }

    #[test]
    fn test_busy_rejection_closes_confirm() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        press(&mut app, KeyCode::Char('S'));
        press(&mut app, KeyCode::Char('d'));
        assert!(matches!(app.view(), View::Confirm(_)));

        assert!(press(&mut app, KeyCode::Char('y')).is_empty());
        assert!(matches!(app.view(), View::Table));
        assert!(app.context().notice.as_ref().unwrap().is_error);
        assert_eq!(app.context().busy.get("vm1").unwrap().kind, BusyKind::Stopping);
    }

    #[test]
    fn test_busy_snapshot_delete_returns_to_manager() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        press(&mut app, KeyCode::Char('S'));
        let op = Operation::SnapshotDelete { vm: "vm1".into(), name: "s1".into() };
        app.update(Message::Request(Request::Confirm(op)));

        let effects = press(&mut app, KeyCode::Enter);
        assert_eq!(effects, vec![Effect::Dispatch(Command::FetchSnapshots("vm1".into()))]);
        assert!(matches!(app.view(), View::SnapshotManage(_)));
        assert!(app.context().notice.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_mount_success_returns_to_mount_manager() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        let op =
            Operation::Mount { vm: "vm1".into(), source: "/src".into(), target: "/mnt".into() };
        app.update(Message::Request(Request::Submit(op)));
        assert!(matches!(app.view(), View::Loading(_)));

        let effects = app.update(finished("vm1", OpKind::Mount, None));
        assert!(effects.contains(&Effect::Dispatch(Command::FetchMounts("vm1".into()))));
        let View::MountManage(manager) = app.view() else {
            panic!("expected mount manager");
        };
        assert_eq!(manager.vm(), "vm1");
    }

    #[test]
    fn test_modify_mount_success_returns_to_mount_manager() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        let op = Operation::ModifyMount {
            vm: "vm1".into(),
            old_target: "/old".into(),
            source: "/src".into(),
            target: "/new".into(),
        };
        app.update(Message::Request(Request::Submit(op)));

        let effects = app.update(finished("vm1", OpKind::ModifyMount, None));
        assert!(effects.contains(&Effect::Dispatch(Command::FetchMounts("vm1".into()))));
        assert!(matches!(app.view(), View::MountManage(_)));
        assert!(!app.context().busy.is_busy("vm1"));
    }

    #[test]
    fn test_foreground_refresh_error_sets_notice() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        let effects = press(&mut app, KeyCode::Char('r'));
        let [Effect::Dispatch(Command::FetchVms { origin: FetchOrigin::Foreground, seq })] =
            effects.as_slice()
        else {
            panic!("expected one foreground fetch, got {effects:?}");
        };

        app.update(Message::VmsFetched {
            origin: FetchOrigin::Foreground,
            seq: *seq,
            result: Err("cannot connect to the multipass socket".into()),
        });
        let notice = app.context().notice.as_ref().unwrap();
        assert!(notice.is_error);
        assert_eq!(notice.text, "Refresh failed: cannot connect to the multipass socket");
        assert_eq!(app.context().vms.len(), 1);
    }

    #[test]
    fn test_yank_copies_primary_address() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        assert_eq!(
            press(&mut app, KeyCode::Char('y')),
            vec![Effect::Yank { vm: "vm1".into(), text: "10.0.0.2".into() }]
        );

        app.update(Message::Yanked {
            vm: "vm1".into(),
            text: "10.0.0.2".into(),
            result: Ok(()),
        });
        let notice = app.context().notice.as_ref().unwrap();
        assert!(!notice.is_error);
        assert_eq!(notice.text, "Copied 10.0.0.2 (vm1)");
    }

    #[test]
    fn test_failed_yank_reports_clipboard_error() {
        let mut app = app();
        with_vms(&mut app, vec![vm("vm1", LifecycleState::Running)]);
        press(&mut app, KeyCode::Char('y'));
        assert!(app.context().notice.is_none());

        app.update(Message::Yanked {
            vm: "vm1".into(),
            text: "10.0.0.2".into(),
            result: Err("no display server".into()),
        });
        let notice = app.context().notice.as_ref().unwrap();
        assert!(notice.is_error);
        assert!(!notice.text.contains("Copied"));
    }

    #[test]
    fn test_quit_stops_rearming() {
        let mut app = app();
        assert_eq!(press(&mut app, KeyCode::Char('q')), vec![Effect::Quit]);
        assert!(app.should_quit());
        assert!(app.update(Message::Tick).is_empty());
    }

    #[test]
    fn test_ctrl_c_quits_from_any_view() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        assert!(matches!(app.view(), View::Create(_)));
        // plain 'q' is text in the form
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit());

        let effects =
            app.update(Message::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert_eq!(effects, vec![Effect::Quit]);
    }
}
