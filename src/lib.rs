//! # Athand Library
//!
//! Internal library for the athand binary application
//!
//! This library exists to enable testing of complex internals and provide
//! clean separation between CLI dispatch (main.rs) and application logic.
//!
//! ## Architecture
//!
//! - **Entry Point**: `Athand` struct provides the main daemon API with resource management
//! - **Calculation**: `oracle` module computes a day's prayer times from coordinates
//! - **Resolution**: `prayer` module holds the schedule types and next-prayer resolver
//! - **Scheduling**: `alarms` module builds and fires the recurring notifications
//! - **Configuration**: `config` module for TOML-based settings, `settings` for
//!   per-prayer notification toggles
//! - **Location**: `location` module resolves coordinates into a timezone and label
//! - **Commands**: `commands` module for CLI subcommands (times, next, toggle)
//! - **Infrastructure**: Signal handling, D-Bus sleep monitoring, lock file, logging

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

// Public API modules
pub mod alarms;
pub mod args;
pub mod commands;
pub mod config;
pub mod location;
pub mod oracle;
pub mod prayer;
pub mod settings;
pub mod signals;

// Internal modules
mod app;
pub(crate) mod dbus;
pub(crate) mod lock;

// Re-export for binary
pub use app::Athand;
