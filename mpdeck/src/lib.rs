//! # mpdeck - Terminal Front-End for a Multipass VM Fleet
//!
//! mpdeck lists every VM the backend knows about, keeps that list fresh with a
//! background poll, and drives lifecycle, snapshot, mount and resource
//! operations through the backend's command-line client, all without ever
//! blocking the keyboard.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Terminal (crossterm)                        │
//! └───────────────┬─────────────────────────────────▲───────────────┘
//!                 │ keys                            │ frames
//!                 ▼                                 │
//! ┌─────────────────────────────────────────────────┴───────────────┐
//! │  tui::run  ── Message ──▶  app::App::update  ──▶ tui::render     │
//! │     ▲                          │                                 │
//! │     │                          │ Effect::Dispatch(Command)       │
//! │     │ Message                  ▼                                 │
//! │  ┌──┴───────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ RefreshScheduler │   │  Dispatcher  │──▶│ Executor         │  │
//! │  │  (Tick timer)    │   │ (1 thread /  │   │  backend calls,  │  │
//! │  └──────────────────┘   │   command)   │   │  template loads  │  │
//! │                         └──────────────┘   └────────┬─────────┘  │
//! └─────────────────────────────────────────────────────┼────────────┘
//!                                                       ▼
//!                                    backend::MultipassCli (subprocess)
//!                                                       │ text / JSON
//!                                                       ▼
//!                                    mpdeck_common (parsers, snapshot tree)
//! ```
//!
//! ## Module Structure
//!
//! - [`app`]: Session coordinator: views, busy tracking, refresh sequencing
//! - [`backend`]: The [`backend::Backend`] trait and its multipass client
//! - [`tui`]: Rendering, forms and the terminal event loop
//! - [`templates`]: Cloud-init template discovery (local dir + git repo)
//! - [`config`]: Config file and platform directories
//! - [`host`]: Host CPU and memory limits for form validation
//! - [`preflight`]: Environment checks before the terminal is taken over
//! - [`cli`]: Command-line arguments
//! - [`domain`]: Operation kinds and error types

pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod domain;
pub mod host;
pub mod preflight;
pub mod templates;
pub mod tui;
