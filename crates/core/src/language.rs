//! Supported scripting languages.
//!
//! Each [`ScriptLanguage`] carries a fixed file extension, a display name,
//! and the default interpreter command used to run a script file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A language the runner knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    Kotlin,
    Swift,
}

impl ScriptLanguage {
    /// Every supported language, in display order.
    pub const ALL: [ScriptLanguage; 2] = [ScriptLanguage::Kotlin, ScriptLanguage::Swift];

    /// File extension (without the dot) that the interpreter expects.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Kotlin => "kts",
            Self::Swift => "swift",
        }
    }

    /// User-facing name, e.g. `"Kotlin"`.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Kotlin => "Kotlin",
            Self::Swift => "Swift",
        }
    }

    /// Lowercase identifier used in configuration values.
    pub fn id(self) -> &'static str {
        match self {
            Self::Kotlin => "kotlin",
            Self::Swift => "swift",
        }
    }

    /// Default interpreter program and its leading arguments; the script
    /// path is appended after them.
    ///
    /// Assumes `kotlinc` or `swift` is available on `PATH`. A missing binary
    /// surfaces as a spawn failure at run time.
    pub fn default_command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Kotlin => ("kotlinc", &["-script"]),
            Self::Swift => ("/usr/bin/env", &["swift"]),
        }
    }

    /// Look up the language that owns `extension` (with or without a leading dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|lang| lang.extension().eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ScriptLanguage {
    type Err = CoreError;

    /// Accepts the identifier (`kotlin`), display name, or extension (`kts`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|lang| {
                lang.id().eq_ignore_ascii_case(needle)
                    || lang.extension().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                CoreError::Validation(format!("Unsupported script language: '{needle}'"))
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
