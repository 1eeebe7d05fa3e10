//! `scriptrunner-core` library crate.
//!
//! Domain types for running short Kotlin and Swift scripts through an
//! external interpreter and relaying their output as a stream of
//! [`ScriptOutput`](output::ScriptOutput) events.

pub mod annotate;
pub mod error;
pub mod language;
pub mod output;
pub mod scripting;
pub mod templates;
