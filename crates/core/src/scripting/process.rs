//! Subprocess-backed script executor.
//!
//! [`ProcessExecutor`] is the real [`ScriptExecutor`]: for every call it
//! materializes the source into its own temp file, spawns the interpreter,
//! pumps stdout and stderr concurrently, and emits `Exit` with the real
//! exit code once both pipes are drained and the process has been reaped.
//!
//! Teardown runs on every path. On cancellation the process is killed and
//! reaped, the temp file is deleted, and nothing further is emitted; the
//! caller decides what the user sees.

use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::language::ScriptLanguage;
use crate::output::{ScriptOutput, EXIT_CODE_INFRASTRUCTURE_FAILURE};

use super::executor::{ExecutionRequest, ScriptError, ScriptExecutor};
use super::launcher::Launcher;
use super::materialize::ScriptFile;
use super::pump::{pump_lines, Pipe, PumpEnd};
use super::stream::{OutputSink, OutputStream};

/// Runs scripts through a locally installed interpreter.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    launcher: Launcher,
    temp_dir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `launcher` to build interpreter command lines.
    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Materialize scripts in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl ScriptExecutor for ProcessExecutor {
    fn execute(&self, code: &str, language: ScriptLanguage) -> OutputStream {
        let request = ExecutionRequest {
            code: code.to_owned(),
            language,
        };
        let launcher = self.launcher.clone();
        let temp_dir = self.temp_dir.clone();

        OutputStream::new(move |sink, cancel| {
            let execution_id = Uuid::now_v7();
            let span = tracing::info_span!(
                "script_execution",
                %execution_id,
                language = language.id(),
            );
            run_execution(request, launcher, temp_dir, sink, cancel).instrument(span)
        })
    }
}

/// How an execution ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Exited(i32),
    Cancelled,
}

async fn run_execution(
    request: ExecutionRequest,
    launcher: Launcher,
    temp_dir: Option<PathBuf>,
    sink: OutputSink,
    cancel: CancellationToken,
) {
    let result = execute(&request, &launcher, temp_dir, &sink, &cancel).await;

    match result {
        Ok(Outcome::Exited(code)) => {
            tracing::info!(exit_code = code, "Script finished");
            sink.emit(ScriptOutput::exit(code));
        }
        Ok(Outcome::Cancelled) => {
            tracing::info!("Script execution cancelled");
        }
        Err(e) if cancel.is_cancelled() => {
            tracing::debug!(error = %e, "Script failed after cancellation");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Script execution failed");
            sink.emit(ScriptOutput::error(e.to_string()));
            sink.emit(ScriptOutput::exit(EXIT_CODE_INFRASTRUCTURE_FAILURE));
        }
    }
}

/// Materialize, run, and always remove the script file.
async fn execute(
    request: &ExecutionRequest,
    launcher: &Launcher,
    temp_dir: Option<PathBuf>,
    sink: &OutputSink,
    cancel: &CancellationToken,
) -> Result<Outcome, ScriptError> {
    let script = ScriptFile::create(temp_dir.as_deref(), &request.code, request.language)?;
    let outcome = run_process(&script, request.language, launcher, sink, cancel).await;
    script.remove();
    outcome
}

/// Spawn the interpreter and supervise it. The child is killed on every
/// path except a normal exit.
async fn run_process(
    script: &ScriptFile,
    language: ScriptLanguage,
    launcher: &Launcher,
    sink: &OutputSink,
    cancel: &CancellationToken,
) -> Result<Outcome, ScriptError> {
    let mut child = launcher
        .command(language, script.path())
        .spawn()
        .map_err(|source| ScriptError::Spawn {
            program: launcher.program(language).to_string(),
            source,
        })?;

    tracing::info!(
        pid = child.id(),
        path = %script.path().display(),
        "Script process started"
    );

    let outcome = supervise(&mut child, sink, cancel).await;
    if !matches!(outcome, Ok(Outcome::Exited(_))) {
        terminate(&mut child).await;
    }
    outcome
}

/// Drain both pipes, then wait for the exit status.
async fn supervise(
    child: &mut Child,
    sink: &OutputSink,
    cancel: &CancellationToken,
) -> Result<Outcome, ScriptError> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout_end, stderr_end) = tokio::join!(
        pump_lines(stdout, Pipe::Stdout, sink, cancel),
        pump_lines(stderr, Pipe::Stderr, sink, cancel),
    );
    if stdout_end? == PumpEnd::Cancelled || stderr_end? == PumpEnd::Cancelled {
        return Ok(Outcome::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(Outcome::Cancelled),
        status = child.wait() => {
            let status = status.map_err(ScriptError::Wait)?;
            Ok(Outcome::Exited(exit_code(status)))
        }
    }
}

/// Force-kill and reap the child. Failures are logged and swallowed.
async fn terminate(child: &mut Child) {
    let pid = child.id();
    if let Err(e) = child.start_kill() {
        tracing::debug!(pid, error = %e, "Kill failed, process may have already exited");
    }
    match child.wait().await {
        Ok(status) => tracing::debug!(pid, %status, "Script process terminated"),
        Err(e) => tracing::warn!(pid, error = %e, "Failed to reap script process"),
    }
}

/// Real exit code, or `128 + signal` for a process killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    EXIT_CODE_INFRASTRUCTURE_FAILURE
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
