//! End-to-end tests for [`RunScript`] over a real [`ProcessExecutor`].
//!
//! Scripts are run with `sh` standing in for the Kotlin interpreter, so the
//! tests only need a POSIX shell.
#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::StreamExt;

use scriptrunner_core::language::ScriptLanguage;
use scriptrunner_core::output::ScriptOutput;
use scriptrunner_core::scripting::launcher::Launcher;
use scriptrunner_core::scripting::process::ProcessExecutor;
use scriptrunner_core::scripting::run::RunScript;

fn sh_runner(dir: &Path) -> RunScript {
    let executor = ProcessExecutor::new()
        .with_launcher(Launcher::new().with_command(ScriptLanguage::Kotlin, ["sh"]))
        .with_temp_dir(dir);
    RunScript::new(Arc::new(executor))
}

async fn run(runner: &RunScript, code: &str) -> Vec<ScriptOutput> {
    let stream = runner.run(code, ScriptLanguage::Kotlin);
    tokio::time::timeout(Duration::from_secs(20), stream.collect::<Vec<_>>())
        .await
        .expect("execution should finish")
}

// ---------------------------------------------------------------------------
// Test: successful run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_script_streams_lines_then_exit_zero() {
    let dir = tempfile::tempdir().expect("temp dir");
    let outputs = run(&sh_runner(dir.path()), "echo 'Hello from Kotlin!'\necho Done.").await;

    assert_eq!(
        outputs,
        vec![
            ScriptOutput::line("Hello from Kotlin!", false),
            ScriptOutput::line("Done.", false),
            ScriptOutput::exit(0),
        ]
    );
}

// ---------------------------------------------------------------------------
// Test: diagnostics are linked to source lines
// ---------------------------------------------------------------------------

#[tokio::test]
async fn compile_diagnostic_links_to_line() {
    let dir = tempfile::tempdir().expect("temp dir");
    let outputs = run(
        &sh_runner(dir.path()),
        "echo \"$0:2:5: error: unresolved reference\" >&2\nexit 1",
    )
    .await;

    assert_eq!(outputs.len(), 2);
    assert_matches!(
        &outputs[0],
        ScriptOutput::Line {
            text,
            is_stderr: true,
            link_range: Some(range),
            target_line_number: Some(2),
        } if range.start == 0 && text[range.clone()].ends_with(".kts:2:5:")
    );
    assert_eq!(outputs[1], ScriptOutput::exit(1));
}

#[tokio::test]
async fn stack_frame_links_to_line() {
    let dir = tempfile::tempdir().expect("temp dir");
    let outputs = run(
        &sh_runner(dir.path()),
        "echo '    at Script.main(script.kts:3)' >&2\nexit 1",
    )
    .await;

    assert_eq!(
        outputs,
        vec![
            ScriptOutput::Line {
                text: "    at Script.main(script.kts:3)".to_string(),
                is_stderr: true,
                link_range: Some(19..31),
                target_line_number: Some(3),
            },
            ScriptOutput::exit(1),
        ]
    );
}

// ---------------------------------------------------------------------------
// Test: validation and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_script_is_rejected_without_a_process() {
    let dir = tempfile::tempdir().expect("temp dir");
    let outputs = run(&sh_runner(dir.path()), "  \n ").await;

    assert_eq!(
        outputs,
        vec![
            ScriptOutput::error("Script cannot be empty"),
            ScriptOutput::exit(1),
        ]
    );
    let leftover = std::fs::read_dir(dir.path()).expect("read dir").count();
    assert_eq!(leftover, 0);
}

#[tokio::test]
async fn cancelled_run_leaves_no_script_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let runner = sh_runner(dir.path());
    let mut stream = runner.run("echo started\nexec sleep 30", ScriptLanguage::Kotlin);

    let first = tokio::time::timeout(Duration::from_secs(20), stream.next())
        .await
        .expect("first line");
    assert_eq!(first, Some(ScriptOutput::line("started", false)));

    tokio::time::timeout(Duration::from_secs(20), stream.shutdown())
        .await
        .expect("teardown should finish");

    let leftover = std::fs::read_dir(dir.path()).expect("read dir").count();
    assert_eq!(leftover, 0);
}
