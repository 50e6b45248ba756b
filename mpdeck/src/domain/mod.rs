//! Domain model for mpdeck
//!
//! This module contains core domain types and errors that provide:
//! - Closed enumerations for every operation the front-end can dispatch
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{BusyKind, FetchOrigin, OpKind};

pub use errors::{BackendError, ConfigError, PreflightError, TemplateError};
