//! Pre-flight checks for mpdeck
//!
//! Validates the environment before the terminal is taken over, so that a
//! missing backend or a piped stdout produces a plain error message instead
//! of a broken screen.

use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use log::debug;

use crate::domain::PreflightError;

/// Run all pre-flight checks. Returns the resolved backend executable.
///
/// # Errors
/// Returns an error if the backend can't be found or stdout isn't a terminal
pub fn run_preflight_checks(backend: &str) -> Result<PathBuf, PreflightError> {
    let program = resolve_program(backend)?;
    debug!("backend resolved to {}", program.display());
    check_terminal()?;
    Ok(program)
}

/// Resolve `program` the way a shell would.
///
/// Names containing a `/` are taken as paths; anything else is searched for
/// in `PATH`.
///
/// # Errors
/// Returns an error if no executable file is found
pub fn resolve_program(program: &str) -> Result<PathBuf, PreflightError> {
    if program.contains('/') {
        let path = Path::new(program);
        if !path.is_file() {
            return Err(PreflightError::BackendNotFound { program: program.to_string() });
        }
        if !is_executable(path) {
            return Err(PreflightError::NotExecutable { path: path.to_path_buf() });
        }
        return Ok(path.to_path_buf());
    }

    let search = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&search)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file() && is_executable(candidate))
        .ok_or_else(|| PreflightError::BackendNotFound { program: program.to_string() })
}

fn check_terminal() -> Result<(), PreflightError> {
    if std::io::stdout().is_terminal() {
        Ok(())
    } else {
        Err(PreflightError::NotATerminal)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
