//! Command-line interface for mpdeck
//!
//! This module contains CLI argument parsing

pub mod args;

pub use args::Args;
