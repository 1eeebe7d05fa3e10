//! Unified script execution interface and shared types.
//!
//! Defines [`ScriptExecutor`], the capability every executor implements,
//! along with [`ExecutionRequest`] and [`ScriptError`].

use crate::language::ScriptLanguage;

use super::stream::OutputStream;

/// One request to run a script. Built per run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Source text, written to disk exactly as given.
    pub code: String,
    pub language: ScriptLanguage,
}

/// Errors that can end an execution. The `Display` text becomes the
/// message of the `ScriptOutput::Error` event.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The submitted script was empty or whitespace only.
    #[error("Script cannot be empty")]
    EmptyScript,

    /// The temporary script file could not be created or written.
    #[error("Failed to write script file: {0}")]
    Materialize(#[source] std::io::Error),

    /// The interpreter process could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading one of the process pipes failed.
    #[error("Failed to read {pipe}: {source}")]
    Read {
        pipe: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the process to exit failed.
    #[error("Failed to wait for script process: {0}")]
    Wait(#[source] std::io::Error),

    /// Anything else, e.g. a panic inside the producer task.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// Capability to run a script and stream its output.
///
/// Implementations must not fail synchronously: every failure is reported
/// on the returned stream as an `Error` event followed by `Exit`. Each call
/// is independent; concurrent calls are not deduplicated.
pub trait ScriptExecutor: Send + Sync {
    /// Run `code` as a `language` script.
    fn execute(&self, code: &str, language: ScriptLanguage) -> OutputStream;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
