//! Caller-level entry point: validate, execute, annotate.

use std::sync::Arc;

use crate::annotate::annotate;
use crate::language::ScriptLanguage;
use crate::output::{ScriptOutput, EXIT_CODE_VALIDATION_FAILURE};

use super::executor::{ScriptError, ScriptExecutor};
use super::stream::OutputStream;

/// Validates a script and starts it on the configured executor.
#[derive(Clone)]
pub struct RunScript {
    executor: Arc<dyn ScriptExecutor>,
}

impl RunScript {
    pub fn new(executor: Arc<dyn ScriptExecutor>) -> Self {
        Self { executor }
    }

    /// Run `code` as a `language` script.
    ///
    /// Blank code short-circuits to `Error("Script cannot be empty")` and
    /// `Exit(1)` without touching the executor. Otherwise every `Line` from
    /// the executor is annotated with its source location, if it has one.
    pub fn run(&self, code: &str, language: ScriptLanguage) -> OutputStream {
        if code.trim().is_empty() {
            tracing::debug!(language = language.id(), "Rejected blank script");
            return OutputStream::from_outputs(vec![
                ScriptOutput::error(ScriptError::EmptyScript.to_string()),
                ScriptOutput::exit(EXIT_CODE_VALIDATION_FAILURE),
            ]);
        }
        self.executor.execute(code, language).map_outputs(annotate)
    }
}

impl std::fmt::Debug for RunScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunScript").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::scripting::scripted::ScriptedExecutor;

    async fn run_with(outputs: Vec<ScriptOutput>, code: &str) -> Vec<ScriptOutput> {
        let use_case = RunScript::new(Arc::new(ScriptedExecutor::new(outputs)));
        use_case.run(code, ScriptLanguage::Kotlin).collect().await
    }

    #[tokio::test]
    async fn blank_code_never_reaches_executor() {
        for language in ScriptLanguage::ALL {
            for code in ["", "   \n\t  "] {
                let executor = Arc::new(ScriptedExecutor::new(vec![ScriptOutput::exit(0)]));
                let use_case = RunScript::new(executor.clone());
                let outputs: Vec<_> = use_case.run(code, language).collect().await;

                assert_eq!(
                    outputs,
                    vec![
                        ScriptOutput::error("Script cannot be empty"),
                        ScriptOutput::exit(1),
                    ]
                );
                assert!(executor.calls().is_empty());
            }
        }
    }

    #[tokio::test]
    async fn compile_error_line_is_annotated() {
        let error_line = "script.kts:5:10: error: unresolved reference 'foo'";
        let outputs = run_with(vec![ScriptOutput::line(error_line, true)], "println(foo)").await;

        assert_eq!(
            outputs,
            vec![ScriptOutput::Line {
                text: error_line.to_string(),
                is_stderr: true,
                link_range: Some(0..16),
                target_line_number: Some(5),
            }]
        );
    }

    #[tokio::test]
    async fn stack_trace_line_is_annotated() {
        let stack_line = "    at Script.main(script.kts:3)";
        let outputs =
            run_with(vec![ScriptOutput::line(stack_line, true)], "throw Exception()").await;

        assert_eq!(
            outputs,
            vec![ScriptOutput::Line {
                text: stack_line.to_string(),
                is_stderr: true,
                link_range: Some(19..31),
                target_line_number: Some(3),
            }]
        );
    }

    #[tokio::test]
    async fn normal_error_and_exit_pass_through() {
        let outputs = vec![
            ScriptOutput::line("Hello from Kotlin!", false),
            ScriptOutput::error("Process failed"),
            ScriptOutput::exit(0),
        ];
        assert_eq!(run_with(outputs.clone(), "println(\"x\")").await, outputs);
    }

    #[tokio::test]
    async fn code_is_forwarded_unchanged() {
        let executor = Arc::new(ScriptedExecutor::new(vec![ScriptOutput::exit(0)]));
        let use_case = RunScript::new(executor.clone());
        let _: Vec<_> = use_case.run("  print(1)\n", ScriptLanguage::Swift).collect().await;

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].code, "  print(1)\n");
        assert_eq!(calls[0].language, ScriptLanguage::Swift);
    }
}
