//! `multipass` command-line backend.

use log::debug;
use std::process::{Command, Stdio};

use super::{Backend, BackendResult, LaunchRequest};
use crate::domain::BackendError;

/// Runs the backend program once per call and captures its output.
#[derive(Debug, Clone)]
pub struct MultipassCli {
    program: String,
}

impl MultipassCli {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    /// Run with `args`, returning stdout on success.
    ///
    /// On a non-zero exit the error text is stderr, or stdout when stderr is
    /// empty, trimmed but otherwise untouched.
    fn run<S: AsRef<str>>(&self, args: &[S]) -> BackendResult<String> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        debug!("exec: {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| BackendError::Spawn { program: self.program.clone(), source })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = match (stderr.trim(), stdout.trim()) {
            ("", "") => format!("{} exited with {}", self.program, output.status),
            ("", out) => out.to_string(),
            (err, _) => err.to_string(),
        };
        Err(BackendError::Failed(message))
    }

    fn run_unit<S: AsRef<str>>(&self, args: &[S]) -> BackendResult<()> {
        self.run(args).map(|_| ())
    }
}

/// Argument vector for `launch`. The release alias goes last as the
/// positional image argument.
pub(super) fn launch_args(request: &LaunchRequest) -> Vec<String> {
    let mut args = vec!["launch".to_string(), "--name".to_string(), request.name.clone()];
    if let Some(cpus) = request.cpus {
        args.extend(["--cpus".to_string(), cpus.to_string()]);
    }
    if let Some(memory) = request.memory_mb {
        args.extend(["--memory".to_string(), format!("{memory}M")]);
    }
    if let Some(disk) = request.disk_gb {
        args.extend(["--disk".to_string(), format!("{disk}G")]);
    }
    if let Some(path) = &request.cloud_init {
        args.extend(["--cloud-init".to_string(), path.to_string_lossy().into_owned()]);
    }
    if let Some(network) = &request.network {
        args.extend(["--network".to_string(), network.clone()]);
    }
    if !request.release.is_empty() {
        args.push(request.release.clone());
    }
    args
}

fn snapshot_args(vm: &str, name: &str, comment: &str) -> Vec<String> {
    let mut args = vec!["snapshot".to_string(), "--name".to_string(), name.to_string()];
    if !comment.is_empty() {
        args.extend(["--comment".to_string(), comment.to_string()]);
    }
    args.push(vm.to_string());
    args
}

impl Backend for MultipassCli {
    fn list_vms(&self) -> BackendResult<String> {
        self.run(&["list"])
    }

    fn vm_info(&self, name: &str) -> BackendResult<String> {
        self.run(&["info", name])
    }

    fn vm_info_all(&self) -> BackendResult<String> {
        self.run(&["info", "--all"])
    }

    fn vm_info_json(&self, name: &str) -> BackendResult<String> {
        self.run(&["info", name, "--format", "json"])
    }

    fn launch(&self, request: &LaunchRequest) -> BackendResult<()> {
        self.run_unit(&launch_args(request))
    }

    fn stop(&self, name: &str) -> BackendResult<()> {
        self.run_unit(&["stop", name])
    }

    fn start(&self, name: &str) -> BackendResult<()> {
        self.run_unit(&["start", name])
    }

    fn suspend(&self, name: &str) -> BackendResult<()> {
        self.run_unit(&["suspend", name])
    }

    fn recover(&self, name: &str) -> BackendResult<()> {
        self.run_unit(&["recover", name])
    }

    fn delete(&self, name: &str, purge: bool) -> BackendResult<()> {
        if purge {
            self.run_unit(&["delete", "--purge", name])
        } else {
            self.run_unit(&["delete", name])
        }
    }

    fn purge_all(&self) -> BackendResult<()> {
        self.run_unit(&["purge"])
    }

    fn list_snapshots(&self) -> BackendResult<String> {
        self.run(&["list", "--snapshots"])
    }

    fn create_snapshot(&self, vm: &str, name: &str, comment: &str) -> BackendResult<()> {
        self.run_unit(&snapshot_args(vm, name, comment))
    }

    fn restore_snapshot(&self, vm: &str, name: &str) -> BackendResult<()> {
        self.run_unit(&["restore", "--destructive", format!("{vm}.{name}").as_str()])
    }

    fn delete_snapshot(&self, vm: &str, name: &str) -> BackendResult<()> {
        self.run_unit(&["delete", "--purge", format!("{vm}.{name}").as_str()])
    }

    fn mount(&self, source: &str, vm: &str, target: &str) -> BackendResult<()> {
        self.run_unit(&["mount", source, format!("{vm}:{target}").as_str()])
    }

    fn umount(&self, vm: &str, target: &str) -> BackendResult<()> {
        self.run_unit(&["umount", format!("{vm}:{target}").as_str()])
    }

    fn get_config(&self, key: &str) -> BackendResult<String> {
        self.run(&["get", key]).map(|value| value.trim().to_string())
    }

    fn set_config(&self, key: &str, value: &str) -> BackendResult<()> {
        self.run_unit(&["set", format!("{key}={value}").as_str()])
    }

    fn version(&self) -> BackendResult<String> {
        self.run(&["version"])
    }
}
