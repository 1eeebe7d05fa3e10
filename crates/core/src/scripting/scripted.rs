//! Scripted executor that replays canned output without running anything.
//!
//! Stands in for a real interpreter where no process can be started, and
//! is the test double used by the use-case and session tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::language::ScriptLanguage;
use crate::output::ScriptOutput;

use super::executor::{ExecutionRequest, ScriptExecutor};
use super::stream::OutputStream;

/// Replays a fixed list of outputs for every call.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    outputs: Vec<ScriptOutput>,
    delay: Duration,
    hold_open: bool,
    calls: Arc<Mutex<Vec<ExecutionRequest>>>,
}

impl ScriptedExecutor {
    pub fn new(outputs: Vec<ScriptOutput>) -> Self {
        Self {
            outputs,
            ..Self::default()
        }
    }

    /// Sleep for `delay` before each output.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// After replaying, keep the stream open until it is cancelled, like a
    /// script that never finishes.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Requests received so far, in call order.
    pub fn calls(&self) -> Vec<ExecutionRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ScriptExecutor for ScriptedExecutor {
    fn execute(&self, code: &str, language: ScriptLanguage) -> OutputStream {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ExecutionRequest {
                code: code.to_owned(),
                language,
            });

        let outputs = self.outputs.clone();
        let delay = self.delay;
        let hold_open = self.hold_open;

        OutputStream::new(move |sink, cancel| async move {
            for output in outputs {
                if !delay.is_zero() {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                if cancel.is_cancelled() || !sink.emit(output) {
                    return;
                }
            }
            if hold_open {
                cancel.cancelled().await;
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
