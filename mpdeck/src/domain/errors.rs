//! Structured error types for mpdeck
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit; carries the backend's own error text verbatim
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Parse(#[from] mpdeck_common::ParseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: expected `key = value`, got {content:?}")]
    Malformed { path: PathBuf, line: usize, content: String },

    #[error("{path}:{line}: empty value for {key}")]
    EmptyValue { path: PathBuf, line: usize, key: String },
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read template directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git {action} failed: {message}")]
    Git { action: &'static str, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Conditions that prevent an interactive session from starting.
#[derive(Error, Debug)]
pub enum PreflightError {
    #[error(
        "{program} not found.\n\n\
         mpdeck drives VMs through the {program} command-line client. Install it, \
         or point --backend at the executable."
    )]
    BackendNotFound { program: String },

    #[error("{path} is not executable")]
    NotExecutable { path: PathBuf },

    #[error("mpdeck needs an interactive terminal (stdout is not a TTY)")]
    NotATerminal,
}
