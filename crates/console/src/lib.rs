//! `scriptrunner-console` library crate.
//!
//! The console side of the script runner: configuration, mapping of
//! execution events to console lines, and the run/stop session state
//! machine. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod console_line;
pub mod render;
pub mod session;
