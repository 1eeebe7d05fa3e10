use std::path::PathBuf;
use std::str::FromStr;

use scriptrunner_core::error::CoreError;
use scriptrunner_core::language::ScriptLanguage;
use scriptrunner_core::scripting::launcher::Launcher;
use scriptrunner_core::scripting::process::ProcessExecutor;

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CoreError::Validation(format!(
                "SCRIPTRUNNER_LOG_FORMAT must be 'text' or 'json' (got '{other}')"
            ))),
        }
    }
}

/// Console configuration loaded from environment variables.
///
/// All fields have defaults suitable for a machine with `kotlinc` and
/// `swift` on `PATH`.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Language used when the script path has no known extension.
    pub default_language: ScriptLanguage,
    /// Kotlin interpreter prefix; the script path is appended.
    pub kotlin_command: Vec<String>,
    /// Swift interpreter prefix; the script path is appended.
    pub swift_command: Vec<String>,
    /// Where scripts are materialized (system temp dir if `None`).
    pub temp_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl ConsoleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default              |
    /// |-------------------------------|----------------------|
    /// | `SCRIPTRUNNER_LANGUAGE`       | `kotlin`             |
    /// | `SCRIPTRUNNER_KOTLIN_COMMAND` | `kotlinc -script`    |
    /// | `SCRIPTRUNNER_SWIFT_COMMAND`  | `/usr/bin/env swift` |
    /// | `SCRIPTRUNNER_TEMP_DIR`       | system temp dir      |
    /// | `SCRIPTRUNNER_LOG_FORMAT`     | `text`               |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let default_language = match lookup("SCRIPTRUNNER_LANGUAGE") {
            Some(value) => value.parse()?,
            None => ScriptLanguage::Kotlin,
        };

        let kotlin_command = command_from(
            "SCRIPTRUNNER_KOTLIN_COMMAND",
            lookup("SCRIPTRUNNER_KOTLIN_COMMAND"),
            ScriptLanguage::Kotlin,
        )?;
        let swift_command = command_from(
            "SCRIPTRUNNER_SWIFT_COMMAND",
            lookup("SCRIPTRUNNER_SWIFT_COMMAND"),
            ScriptLanguage::Swift,
        )?;

        let temp_dir = lookup("SCRIPTRUNNER_TEMP_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let log_format = match lookup("SCRIPTRUNNER_LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::Text,
        };

        Ok(Self {
            default_language,
            kotlin_command,
            swift_command,
            temp_dir,
            log_format,
        })
    }

    /// Launcher with the configured interpreter commands.
    pub fn launcher(&self) -> Launcher {
        Launcher::new()
            .with_command(ScriptLanguage::Kotlin, self.kotlin_command.iter().cloned())
            .with_command(ScriptLanguage::Swift, self.swift_command.iter().cloned())
    }

    /// Process executor wired with this configuration.
    pub fn executor(&self) -> ProcessExecutor {
        let executor = ProcessExecutor::new().with_launcher(self.launcher());
        match &self.temp_dir {
            Some(dir) => executor.with_temp_dir(dir.clone()),
            None => executor,
        }
    }
}

fn command_from(
    key: &str,
    value: Option<String>,
    language: ScriptLanguage,
) -> Result<Vec<String>, CoreError> {
    let Some(value) = value else {
        let (program, args) = language.default_command();
        return Ok(std::iter::once(program)
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect());
    };
    let parts: Vec<String> = value.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        return Err(CoreError::Validation(format!("{key} must not be empty")));
    }
    Ok(parts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
