//! Tessera Connection - saved connections, sessions and their lifetimes
//!
//! This crate sits between a front end and the drivers. It loads saved
//! connection records, runs their setup commands, opens sessions through the
//! driver registry, and enforces the per-connection rules: read-only
//! boundaries and at most one commit in flight.

mod config;
mod lifetime;
mod manager;
mod session;
mod setup;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod lifetime_tests;
#[cfg(test)]
mod session_tests;
#[cfg(test)]
mod setup_tests;

pub use config::{ClientSettings, ConnectionsFile, SavedConnection, SetupCommand};
pub use lifetime::LifetimeToken;
pub use manager::ConnectionManager;
pub use session::{DocumentSession, RelationalSession, Session};
pub use setup::{BackgroundProcess, run_setup_commands, wait_for_port};
