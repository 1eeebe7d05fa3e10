//! Run/stop session state machine.
//!
//! [`Session`] owns the editor contents and the console, turns user
//! [`Intent`]s into executions, and folds every [`ScriptOutput`] into
//! [`SessionState`]. State is published through a [`tokio::sync::watch`]
//! channel; one-shot UI effects go through an unbounded mpsc channel.
//!
//! A run is only started from [`RunState::Idle`]. Stopping cancels the
//! execution stream (which kills the process and removes its temp file)
//! and appends the synthetic "stopped" line with exit code 130. Outputs
//! that race with a stop are discarded.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use scriptrunner_core::language::ScriptLanguage;
use scriptrunner_core::output::{ScriptOutput, EXIT_CODE_INFRASTRUCTURE_FAILURE, EXIT_CODE_STOPPED};
use scriptrunner_core::scripting::run::RunScript;
use scriptrunner_core::templates::template_for;

use crate::console_line::ConsoleLine;

/// System line appended when the user stops a run.
pub const STOPPED_MESSAGE: &str = "Script execution stopped.";

/// Execution state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    /// A stop was requested and teardown is in progress.
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub code: String,
    pub language: ScriptLanguage,
    pub run_state: RunState,
    pub exit_code: Option<i32>,
    pub output_lines: Vec<ConsoleLine>,
    /// Number of runs started; bumps whenever `output_lines` is cleared.
    pub run_count: u64,
}

/// User actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    UpdateCode(String),
    /// Switch language; the editor is reset to that language's template.
    ChangeLanguage(ScriptLanguage),
    RunScript,
    StopScript,
    /// Navigate the editor to a 1-indexed line.
    JumpToLine(u32),
}

/// One-shot UI effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Scroll the editor to a 1-indexed line.
    ScrollToLine(u32),
    ShowErrorToast(String),
}

/// The execution currently attached to the session.
struct Execution {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct Session {
    run_script: RunScript,
    state: Arc<watch::Sender<SessionState>>,
    effects_tx: mpsc::UnboundedSender<SessionEffect>,
    effects_rx: Option<mpsc::UnboundedReceiver<SessionEffect>>,
    execution: Option<Execution>,
}

impl Session {
    /// New idle session with `language`'s template in the editor.
    pub fn new(run_script: RunScript, language: ScriptLanguage) -> Self {
        let (state, _) = watch::channel(SessionState {
            code: template_for(language).to_string(),
            language,
            run_state: RunState::Idle,
            exit_code: None,
            output_lines: Vec::new(),
            run_count: 0,
        });
        let (effects_tx, effects_rx) = mpsc::unbounded_channel();
        Self {
            run_script,
            state: Arc::new(state),
            effects_tx,
            effects_rx: Some(effects_rx),
            execution: None,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Take the effect receiver. Only the first call returns `Some`.
    pub fn take_effects(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEffect>> {
        self.effects_rx.take()
    }

    pub fn on_intent(&mut self, intent: Intent) {
        match intent {
            Intent::UpdateCode(code) => {
                self.state.send_modify(|s| s.code = code);
            }
            Intent::ChangeLanguage(language) => {
                self.state.send_modify(|s| {
                    s.language = language;
                    s.code = template_for(language).to_string();
                });
            }
            Intent::RunScript => self.run(),
            Intent::StopScript => self.stop(),
            Intent::JumpToLine(line) => {
                let _ = self.effects_tx.send(SessionEffect::ScrollToLine(line));
            }
        }
    }

    /// Wait for the attached execution task to finish, including process
    /// teardown after a stop.
    pub async fn wait(&mut self) {
        if let Some(execution) = self.execution.take() {
            if let Err(e) = execution.task.await {
                tracing::warn!(error = %e, "Session execution task failed");
            }
        }
    }

    fn run(&mut self) {
        let (code, language) = {
            let state = self.state.borrow();
            if state.run_state != RunState::Idle {
                tracing::debug!(run_state = ?state.run_state, "Run ignored, session busy");
                return;
            }
            (state.code.clone(), state.language)
        };

        // A finished run may still hold its stream; make sure nothing from
        // it lands in the new run's console.
        if let Some(previous) = self.execution.take() {
            previous.cancel.cancel();
        }

        self.state.send_modify(|s| {
            s.run_state = RunState::Running;
            s.output_lines.clear();
            s.exit_code = None;
            s.run_count += 1;
        });
        tracing::info!(language = language.id(), "Running script");

        let stream = self.run_script.run(&code, language);
        let cancel = stream.cancellation_token();
        let state = Arc::clone(&self.state);
        let effects = self.effects_tx.clone();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let mut stream = stream;
            while let Some(output) = stream.next().await {
                apply_output(&state, &effects, &task_cancel, output);
            }
            stream.shutdown().await;
        });

        self.execution = Some(Execution { cancel, task });
    }

    fn stop(&mut self) {
        if self.state.borrow().run_state != RunState::Running {
            return;
        }
        self.state.send_modify(|s| s.run_state = RunState::Stopping);

        if let Some(execution) = self.execution.as_ref() {
            execution.cancel.cancel();
        }

        self.state.send_modify(|s| {
            s.run_state = RunState::Idle;
            s.output_lines.push(ConsoleLine::system(STOPPED_MESSAGE));
            s.exit_code = Some(EXIT_CODE_STOPPED);
        });
        tracing::info!("Script execution stopped by user");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The detached task then kills the process and removes its file.
        if let Some(execution) = self.execution.take() {
            execution.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.state.borrow())
            .field("has_execution", &self.execution.is_some())
            .finish()
    }
}

/// Fold one output into the state unless the run was cancelled.
fn apply_output(
    state: &watch::Sender<SessionState>,
    effects: &mpsc::UnboundedSender<SessionEffect>,
    cancel: &CancellationToken,
    output: ScriptOutput,
) {
    let line = ConsoleLine::from(&output);
    let applied = state.send_if_modified(|s| {
        // Checked under the state lock so a concurrent stop wins cleanly.
        if cancel.is_cancelled() {
            return false;
        }
        s.output_lines.push(line);
        match &output {
            ScriptOutput::Exit { code } => {
                s.run_state = RunState::Idle;
                s.exit_code = Some(*code);
            }
            ScriptOutput::Error { .. } => {
                s.run_state = RunState::Idle;
                s.exit_code = Some(EXIT_CODE_INFRASTRUCTURE_FAILURE);
            }
            ScriptOutput::Line { .. } => {}
        }
        true
    });

    if applied {
        if let ScriptOutput::Error { message } = output {
            let _ = effects.send(SessionEffect::ShowErrorToast(message));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
