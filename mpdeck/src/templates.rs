//! Cloud-init template discovery
//!
//! Two sources, merged into one list for the create form:
//!
//! ```text
//! ~/.config/mpdeck/templates/*.yaml   local, first line must be "#cloud-config"
//! <template_repo> (shallow clone)     remote, every .yaml/.yml file counts
//! ```
//!
//! The remote repository is cloned once into the cache directory and fast-
//! forwarded on later runs. Remote failures are logged and never reach the
//! user; the local templates are still offered.

use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::domain::TemplateError;

const CLOUD_CONFIG_MARKER: &str = "#cloud-config";

/// Where templates come from.
#[derive(Debug, Clone, Default)]
pub struct TemplateSources {
    pub local_dir: Option<PathBuf>,
    pub repo: Option<String>,
    pub cache_dir: PathBuf,
}

/// One selectable cloud-init file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// File stem, shown in the create form
    pub name: String,
    pub path: PathBuf,
    pub remote: bool,
}

impl Template {
    /// Label for the create form ("web" or "web (repo)").
    #[must_use]
    pub fn label(&self) -> String {
        if self.remote {
            format!("{} (repo)", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Load every template from `sources`. Never fails: problems are logged.
#[must_use]
pub fn load_all(sources: &TemplateSources) -> Vec<Template> {
    let mut templates = Vec::new();

    if let Some(dir) = &sources.local_dir {
        match scan_dir(dir, true) {
            Ok(found) => {
                info!("Found {} local templates in {}", found.len(), dir.display());
                templates.extend(found);
            }
            Err(TemplateError::ReadDir { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                debug!("No local template directory at {}", dir.display());
            }
            Err(e) => warn!("{e}"),
        }
    }

    if let Some(repo) = &sources.repo {
        match sync_repo(repo, &sources.cache_dir).and_then(|()| scan_dir(&sources.cache_dir, false))
        {
            Ok(found) => {
                info!("Found {} templates in {repo}", found.len());
                templates.extend(found);
            }
            Err(e) => warn!("Template repository {repo} unavailable: {e}"),
        }
    }

    templates
}

/// Scan `dir` (non-recursively) for `.yaml`/`.yml` files, sorted by name.
///
/// # Errors
/// Returns [`TemplateError::ReadDir`] if the directory can't be listed.
pub fn scan_dir(dir: &Path, require_marker: bool) -> Result<Vec<Template>, TemplateError> {
    let entries = fs::read_dir(dir)
        .map_err(|source| TemplateError::ReadDir { path: dir.to_path_buf(), source })?;

    let mut templates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || !has_template_extension(&path) {
            continue;
        }
        if require_marker && !starts_with_marker(&path) {
            debug!("Skipping {}: no {CLOUD_CONFIG_MARKER} header", path.display());
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        templates.push(Template { name, path, remote: !require_marker });
    }

    templates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(templates)
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

fn starts_with_marker(path: &Path) -> bool {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| content.lines().next().map(|l| l.trim_end() == CLOUD_CONFIG_MARKER))
        .unwrap_or(false)
}

/// Clone `repo` into `dest`, or fast-forward an existing clone.
fn sync_repo(repo: &str, dest: &Path) -> Result<(), TemplateError> {
    if dest.join(".git").is_dir() {
        let dest = dest.to_string_lossy().into_owned();
        return git("pull", &["-C", dest.as_str(), "pull", "--ff-only", "--quiet"]);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let dest = dest.to_string_lossy().into_owned();
    git("clone", &["clone", "--depth", "1", "--quiet", repo, dest.as_str()])
}

fn git(action: &'static str, args: &[&str]) -> Result<(), TemplateError> {
    debug!("git {}", args.join(" "));
    let output = Command::new("git")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| TemplateError::Git { action, message: e.to_string() })?;

    if output.status.success() {
        Ok(())
    } else {
        let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(TemplateError::Git { action, message })
    }
}
