//! Startup configuration
//!
//! A small `key = value` file read once at startup:
//!
//! ```text
//! # remote cloud-init templates (shallow-cloned into the cache dir)
//! template_repo = https://github.com/example/cloud-init-templates.git
//! ```
//!
//! Blank lines and `#` comments are ignored, values may be quoted, unknown keys
//! are logged and skipped. Platform directories come from
//! [`directories::ProjectDirs`].

use directories::ProjectDirs;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::ConfigError;

const CONFIG_FILENAME: &str = "config";
const TEMPLATES_DIR: &str = "templates";
const TEMPLATE_CACHE_DIR: &str = "template-repo";
const LOG_FILENAME: &str = "mpdeck.log";

/// Settings read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Remote repository holding cloud-init templates
    pub template_repo: Option<String>,
}

impl AppConfig {
    /// Parse config file contents. `path` is only used in error messages.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for a line without `=` or with an empty value.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Malformed {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    content: raw.to_string(),
                });
            };
            let key = key.trim();
            let value = unquote(value.trim());

            match key {
                "template_repo" => {
                    if value.is_empty() {
                        return Err(ConfigError::EmptyValue {
                            path: path.to_path_buf(),
                            line: idx + 1,
                            key: key.to_string(),
                        });
                    }
                    config.template_repo = Some(value.to_string());
                }
                other => warn!("{}:{}: ignoring unknown key {other:?}", path.display(), idx + 1),
            }
        }

        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults when
    /// `missing_ok` is set (the implicit default location), and is an error
    /// otherwise (a path the user asked for).
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file can't be read or doesn't parse.
    pub fn load(path: &Path, missing_ok: bool) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path),
            Err(e) if missing_ok && e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path: path.to_path_buf(), source }),
        }
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

/// Per-user directories for config, template cache and the log file.
#[derive(Debug, Clone)]
pub struct AppDirs {
    config_dir: PathBuf,
    cache_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppDirs {
    /// Platform directories for the current user, falling back to the
    /// working directory when no home directory can be determined.
    #[must_use]
    pub fn discover() -> Self {
        match ProjectDirs::from("", "", "mpdeck") {
            Some(dirs) => Self {
                config_dir: dirs.config_dir().to_path_buf(),
                cache_dir: dirs.cache_dir().to_path_buf(),
                data_dir: dirs.data_dir().to_path_buf(),
            },
            None => {
                warn!("Could not determine home directory, using ./.mpdeck");
                let base = PathBuf::from(".mpdeck");
                Self { config_dir: base.clone(), cache_dir: base.join("cache"), data_dir: base }
            }
        }
    }

    /// ~/.config/mpdeck/config
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILENAME)
    }

    /// ~/.config/mpdeck/templates/
    #[must_use]
    pub fn templates_dir(&self) -> PathBuf {
        self.config_dir.join(TEMPLATES_DIR)
    }

    /// ~/.cache/mpdeck/template-repo/
    #[must_use]
    pub fn template_cache_dir(&self) -> PathBuf {
        self.cache_dir.join(TEMPLATE_CACHE_DIR)
    }

    /// ~/.local/share/mpdeck/mpdeck.log
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join(LOG_FILENAME)
    }
}
