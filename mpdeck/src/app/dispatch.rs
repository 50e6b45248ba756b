//! Background command dispatcher
//!
//! [`Executor`] turns one [`Command`] into exactly one [`Message`] by running
//! blocking backend calls. [`Dispatcher`] runs each command on its own named
//! thread and posts the message to the coordinator's inbound channel. Nothing
//! here touches UI state, and nothing is retried.

use crossbeam_channel::Sender;
use log::{debug, info, warn};
use mpdeck_common::{
    merge_details, parse_info_blocks, parse_mounts_json, parse_snapshot_list, parse_vm_list,
    InfoBlock, VmSummary,
};
use std::sync::Arc;
use std::thread;

use super::message::{Command, Message, OpResult, Operation};
use crate::backend::{Backend, BackendResult, ResourceKey, ResourceSettings};
use crate::domain::BackendError;
use crate::templates::{self, TemplateSources};

/// Runs commands synchronously against a backend.
pub struct Executor {
    backend: Arc<dyn Backend>,
    templates: TemplateSources,
}

impl Executor {
    pub fn new(backend: Arc<dyn Backend>, templates: TemplateSources) -> Self {
        Self { backend, templates }
    }

    /// Run `command` to completion and describe the outcome.
    pub fn execute(&self, command: Command) -> Message {
        debug!("Executing {}", command.label());
        match command {
            Command::FetchVms { origin, seq } => {
                Message::VmsFetched { origin, seq, result: self.fetch_vms().map_err(text) }
            }
            Command::FetchInfo(vm) => {
                let result = self.fetch_info(&vm).map_err(text);
                Message::InfoFetched { vm, result }
            }
            Command::FetchSnapshots(vm) => {
                let result = self
                    .backend
                    .list_snapshots()
                    .map(|out| {
                        parse_snapshot_list(&out).into_iter().filter(|s| s.instance == vm).collect()
                    })
                    .map_err(text);
                Message::SnapshotsFetched { vm, result }
            }
            Command::FetchMounts(vm) => {
                let result = self
                    .backend
                    .vm_info_json(&vm)
                    .and_then(|json| parse_mounts_json(&vm, &json).map_err(BackendError::from))
                    .map_err(text);
                Message::MountsFetched { vm, result }
            }
            Command::FetchResources(vm) => {
                let result = self.fetch_resources(&vm).map_err(text);
                Message::ResourcesFetched { vm, result }
            }
            Command::FetchVersion => {
                Message::VersionFetched(self.backend.version().map_err(text))
            }
            Command::LoadTemplates => {
                Message::TemplatesLoaded(templates::load_all(&self.templates))
            }
            Command::Run(op) => Message::OpFinished(self.run(&op)),
        }
    }

    /// `list`, then `info --all` merged in by name. A details failure
    /// degrades to the list-only summaries.
    fn fetch_vms(&self) -> BackendResult<Vec<VmSummary>> {
        let mut vms = parse_vm_list(&self.backend.list_vms()?);
        if vms.is_empty() {
            return Ok(vms);
        }
        match self.backend.vm_info_all() {
            Ok(details) => merge_details(&mut vms, &parse_info_blocks(&details)),
            Err(e) => warn!("VM details unavailable, showing list only: {e}"),
        }
        Ok(vms)
    }

    fn fetch_info(&self, vm: &str) -> BackendResult<InfoBlock> {
        let out = self.backend.vm_info(vm)?;
        let blocks = parse_info_blocks(&out);
        Ok(blocks
            .iter()
            .find(|b| b.name() == Some(vm))
            .or_else(|| blocks.first())
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_resources(&self, vm: &str) -> BackendResult<ResourceSettings> {
        Ok(ResourceSettings {
            cpus: self.backend.get_config(&ResourceKey::Cpus.key(vm))?,
            memory: self.backend.get_config(&ResourceKey::Memory.key(vm))?,
            disk: self.backend.get_config(&ResourceKey::Disk.key(vm))?,
        })
    }

    fn run(&self, op: &Operation) -> OpResult {
        let outcome = self.apply(op);
        let result = OpResult {
            entity: op.entity().map(str::to_string),
            kind: op.kind(),
            error: outcome.err().map(|e| e.to_string()),
        };
        match &result.error {
            None => info!("{} {} succeeded", result.kind, result.entity.as_deref().unwrap_or("")),
            Some(e) => {
                warn!("{} {} failed: {e}", result.kind, result.entity.as_deref().unwrap_or(""));
            }
        }
        result
    }

    fn apply(&self, op: &Operation) -> BackendResult<()> {
        let backend = &self.backend;
        match op {
            Operation::Stop(vm) => backend.stop(vm),
            Operation::Start(vm) => backend.start(vm),
            Operation::Suspend(vm) => backend.suspend(vm),
            Operation::Recover(vm) => backend.recover(vm),
            Operation::Launch(request) => backend.launch(request),
            Operation::Delete { vm, purge } => backend.delete(vm, *purge),
            Operation::PurgeAll => backend.purge_all(),
            Operation::SnapshotCreate { vm, name, comment } => {
                backend.create_snapshot(vm, name, comment)
            }
            Operation::SnapshotRestore { vm, name } => backend.restore_snapshot(vm, name),
            Operation::SnapshotDelete { vm, name } => backend.delete_snapshot(vm, name),
            Operation::Mount { vm, source, target } => backend.mount(source, vm, target),
            Operation::Umount { vm, target } => backend.umount(vm, target),
            Operation::ModifyMount { vm, old_target, source, target } => {
                backend.umount(vm, old_target)?;
                backend.mount(source, vm, target)
            }
            Operation::SetResources { vm, changes } => {
                for (key, value) in changes {
                    backend.set_config(&key.key(vm), value)?;
                }
                Ok(())
            }
        }
    }
}

fn text(err: BackendError) -> String {
    err.to_string()
}

/// Runs commands off the event loop, one thread per command.
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<Executor>,
    tx: Sender<Message>,
}

impl Dispatcher {
    pub fn new(executor: Executor, tx: Sender<Message>) -> Self {
        Self { executor: Arc::new(executor), tx }
    }

    /// Start `command` in the background. Its message is posted when it
    /// completes; if the worker thread can't be started, a failure message is
    /// posted instead.
    pub fn dispatch(&self, command: Command) {
        let label = command.label();
        let fallback = command.clone();
        let executor = Arc::clone(&self.executor);
        let tx = self.tx.clone();

        let spawned = thread::Builder::new().name(label.clone()).spawn(move || {
            let message = executor.execute(command);
            // Receiver gone means the UI has exited
            let _ = tx.send(message);
        });

        if let Err(e) = spawned {
            warn!("Failed to start worker for {label}: {e}");
            let _ = self.tx.send(fallback.into_failure(e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LaunchRequest;
    use crate::domain::{FetchOrigin, OpKind};
    use std::sync::Mutex;

    /// Records calls; fails any call whose name is in `failing`.
    #[derive(Default)]
    struct Scripted {
        calls: Mutex<Vec<String>>,
        failing: Vec<&'static str>,
        list: String,
        info_all: Option<String>,
    }

    impl Scripted {
        fn call(&self, name: &str, detail: String) -> BackendResult<()> {
            self.calls.lock().unwrap().push(format!("{name} {detail}").trim().to_string());
            if self.failing.iter().any(|f| *f == name) {
                Err(BackendError::Failed(format!("{name} failed")))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Backend for Scripted {
        fn list_vms(&self) -> BackendResult<String> {
            self.call("list", String::new())?;
            Ok(self.list.clone())
        }
        fn vm_info(&self, name: &str) -> BackendResult<String> {
            self.call("info", name.into())?;
            Ok(format!("Name: {name}\nState: Running\n"))
        }
        fn vm_info_all(&self) -> BackendResult<String> {
            self.call("info-all", String::new())?;
            self.info_all.clone().ok_or_else(|| BackendError::Failed("no details".into()))
        }
        fn vm_info_json(&self, name: &str) -> BackendResult<String> {
            self.call("info-json", name.into())?;
            Ok(format!(r#"{{"info": {{"{name}": {{"mounts": {{}}}}}}}}"#))
        }
        fn launch(&self, request: &LaunchRequest) -> BackendResult<()> {
            self.call("launch", request.name.clone())
        }
        fn stop(&self, name: &str) -> BackendResult<()> {
            self.call("stop", name.into())
        }
        fn start(&self, name: &str) -> BackendResult<()> {
            self.call("start", name.into())
        }
        fn suspend(&self, name: &str) -> BackendResult<()> {
            self.call("suspend", name.into())
        }
        fn recover(&self, name: &str) -> BackendResult<()> {
            self.call("recover", name.into())
        }
        fn delete(&self, name: &str, purge: bool) -> BackendResult<()> {
            self.call("delete", format!("{name} {purge}"))
        }
        fn purge_all(&self) -> BackendResult<()> {
            self.call("purge", String::new())
        }
        fn list_snapshots(&self) -> BackendResult<String> {
            self.call("snapshots", String::new())?;
            Ok("Instance Snapshot Parent Comment\nvm1 base -- --\nvm2 other -- --\n".into())
        }
        fn create_snapshot(&self, vm: &str, name: &str, _comment: &str) -> BackendResult<()> {
            self.call("snapshot", format!("{vm}.{name}"))
        }
        fn restore_snapshot(&self, vm: &str, name: &str) -> BackendResult<()> {
            self.call("restore", format!("{vm}.{name}"))
        }
        fn delete_snapshot(&self, vm: &str, name: &str) -> BackendResult<()> {
            self.call("delete-snapshot", format!("{vm}.{name}"))
        }
        fn mount(&self, source: &str, vm: &str, target: &str) -> BackendResult<()> {
            self.call("mount", format!("{source} {vm}:{target}"))
        }
        fn umount(&self, vm: &str, target: &str) -> BackendResult<()> {
            self.call("umount", format!("{vm}:{target}"))
        }
        fn get_config(&self, key: &str) -> BackendResult<String> {
            self.call("get", key.into())?;
            Ok("2".into())
        }
        fn set_config(&self, key: &str, value: &str) -> BackendResult<()> {
            self.call("set", format!("{key}={value}"))
        }
        fn version(&self) -> BackendResult<String> {
            self.call("version", String::new())?;
            Ok("multipass 1.14.0".into())
        }
    }

    fn executor(backend: &Arc<Scripted>) -> Executor {
        let dyn_backend: Arc<dyn Backend> = backend.clone();
        Executor::new(dyn_backend, TemplateSources::default())
    }

    const LIST: &str = "Name State IPv4 Image\nvm1 Running 10.0.0.2 Ubuntu 24.04 LTS\n";

    #[test]
    fn test_stop_failure_is_verbatim() {
        let backend = Arc::new(Scripted { failing: vec!["stop"], ..Default::default() });
        let msg = executor(&backend).execute(Command::Run(Operation::Stop("vm1".into())));
        assert_eq!(
            msg,
            Message::OpFinished(OpResult {
                entity: Some("vm1".into()),
                kind: OpKind::Stop,
                error: Some("stop failed".into()),
            })
        );
    }

    #[test]
    fn test_modify_mount_short_circuits() {
        let backend = Arc::new(Scripted { failing: vec!["umount"], ..Default::default() });
        let op = Operation::ModifyMount {
            vm: "vm1".into(),
            old_target: "/old".into(),
            source: "/src".into(),
            target: "/new".into(),
        };
        let Message::OpFinished(result) = executor(&backend).execute(Command::Run(op)) else {
            panic!("expected OpFinished");
        };
        assert_eq!(result.error.as_deref(), Some("umount failed"));
        assert_eq!(backend.calls(), vec!["umount vm1:/old"]);
    }

    #[test]
    fn test_modify_mount_runs_both_steps() {
        let backend = Arc::new(Scripted::default());
        let op = Operation::ModifyMount {
            vm: "vm1".into(),
            old_target: "/old".into(),
            source: "/src".into(),
            target: "/new".into(),
        };
        let Message::OpFinished(result) = executor(&backend).execute(Command::Run(op)) else {
            panic!("expected OpFinished");
        };
        assert!(result.error.is_none());
        assert_eq!(backend.calls(), vec!["umount vm1:/old", "mount /src vm1:/new"]);
    }

    #[test]
    fn test_set_resources_stops_at_first_failure() {
        let backend = Arc::new(Scripted { failing: vec!["set"], ..Default::default() });
        let op = Operation::SetResources {
            vm: "vm1".into(),
            changes: vec![(ResourceKey::Cpus, "4".into()), (ResourceKey::Memory, "4G".into())],
        };
        executor(&backend).execute(Command::Run(op));
        assert_eq!(backend.calls(), vec!["set local.vm1.cpus=4"]);
    }

    #[test]
    fn test_fetch_vms_falls_back_to_list_only() {
        let backend =
            Arc::new(Scripted { list: LIST.into(), info_all: None, ..Default::default() });
        let msg = executor(&backend)
            .execute(Command::FetchVms { origin: FetchOrigin::Background, seq: 7 });
        let Message::VmsFetched { seq, result: Ok(vms), .. } = msg else {
            panic!("expected VmsFetched");
        };
        assert_eq!(seq, 7);
        assert_eq!(vms.len(), 1);
        assert_eq!(vms[0].cpus, None);
    }

    #[test]
    fn test_fetch_vms_merges_details() {
        let backend = Arc::new(Scripted {
            list: LIST.into(),
            info_all: Some("Name: vm1\nCPU(s): 4\n".into()),
            ..Default::default()
        });
        let msg = executor(&backend)
            .execute(Command::FetchVms { origin: FetchOrigin::Foreground, seq: 1 });
        let Message::VmsFetched { result: Ok(vms), .. } = msg else {
            panic!("expected VmsFetched");
        };
        assert_eq!(vms[0].cpus, Some(4));
    }

    #[test]
    fn test_snapshots_filtered_to_vm() {
        let backend = Arc::new(Scripted::default());
        let msg = executor(&backend).execute(Command::FetchSnapshots("vm1".into()));
        let Message::SnapshotsFetched { result: Ok(snaps), .. } = msg else {
            panic!("expected SnapshotsFetched");
        };
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].name, "base");
    }

    #[test]
    fn test_dispatcher_posts_one_message() {
        let backend = Arc::new(Scripted::default());
        let (tx, rx) = crossbeam_channel::unbounded();
        let dispatcher = Dispatcher::new(executor(&backend), tx);
        dispatcher.dispatch(Command::FetchVersion);

        let msg = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert_eq!(msg, Message::VersionFetched(Ok("multipass 1.14.0".into())));
        assert!(rx.recv_timeout(std::time::Duration::from_millis(100)).is_err());
    }
}
