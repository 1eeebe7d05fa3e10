//! Events produced by a script execution.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Half-open byte span inside a line's text that should render as a link.
pub type LinkRange = Range<usize>;

/// Exit code reported for infrastructure failures (spawn, I/O, panics).
pub const EXIT_CODE_INFRASTRUCTURE_FAILURE: i32 = -1;

/// Exit code reported when validation rejects a script before it runs.
pub const EXIT_CODE_VALIDATION_FAILURE: i32 = 1;

/// Conventional exit code for a run stopped by the user.
pub const EXIT_CODE_STOPPED: i32 = 130;

/// One event in an execution stream.
///
/// `Line` and `Error` may appear any number of times; a started stream is
/// always terminated by exactly one `Exit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptOutput {
    /// One line of process output, optionally annotated with a source location.
    Line {
        text: String,
        is_stderr: bool,
        link_range: Option<LinkRange>,
        target_line_number: Option<u32>,
    },
    /// Execution-infrastructure failure, distinct from the script's own stderr.
    Error { message: String },
    /// Terminal event.
    Exit { code: i32 },
}

impl ScriptOutput {
    /// An unannotated output line.
    pub fn line(text: impl Into<String>, is_stderr: bool) -> Self {
        Self::Line {
            text: text.into(),
            is_stderr,
            link_range: None,
            target_line_number: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn exit(code: i32) -> Self {
        Self::Exit { code }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
