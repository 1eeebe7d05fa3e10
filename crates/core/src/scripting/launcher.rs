//! Interpreter command lines.
//!
//! Maps a [`ScriptLanguage`] to the command that runs a script file. The
//! defaults are `kotlinc -script <file>` and `/usr/bin/env swift <file>`;
//! either can be replaced, e.g. to point at a specific toolchain or, in
//! tests, at `sh`.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::language::ScriptLanguage;

/// Program plus leading arguments; the script path goes after them.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandPrefix {
    program: String,
    args: Vec<String>,
}

/// Builds interpreter processes for script files.
#[derive(Debug, Clone, Default)]
pub struct Launcher {
    overrides: HashMap<ScriptLanguage, CommandPrefix>,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the command prefix for `language`. The script path is
    /// appended after `command`. An empty `command` restores the default.
    pub fn with_command<I, S>(mut self, language: ScriptLanguage, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = command.into_iter().map(Into::into);
        match parts.next() {
            Some(program) => {
                let args = parts.collect();
                self.overrides.insert(language, CommandPrefix { program, args });
            }
            None => {
                self.overrides.remove(&language);
            }
        }
        self
    }

    /// Program name that will be spawned for `language`.
    pub fn program(&self, language: ScriptLanguage) -> &str {
        match self.overrides.get(&language) {
            Some(prefix) => &prefix.program,
            None => language.default_command().0,
        }
    }

    /// Arguments placed before the script path.
    fn leading_args(&self, language: ScriptLanguage) -> Vec<&str> {
        match self.overrides.get(&language) {
            Some(prefix) => prefix.args.iter().map(String::as_str).collect(),
            None => language.default_command().1.to_vec(),
        }
    }

    /// Full argument vector (program first) for running `script`.
    pub fn command_line(&self, language: ScriptLanguage, script: &Path) -> Vec<String> {
        let mut argv = vec![self.program(language).to_string()];
        argv.extend(self.leading_args(language).into_iter().map(str::to_string));
        argv.push(script.to_string_lossy().into_owned());
        argv
    }

    /// Configure, but do not spawn, the interpreter process for `script`.
    ///
    /// stdout and stderr are piped separately so each line keeps its origin;
    /// stdin is closed. The working directory is the script's directory and
    /// the child is killed if its handle is dropped.
    pub fn command(&self, language: ScriptLanguage, script: &Path) -> Command {
        let mut cmd = Command::new(self.program(language));
        cmd.args(self.leading_args(language))
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = script.parent() {
            cmd.current_dir(dir);
        }
        cmd
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
