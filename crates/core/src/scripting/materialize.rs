//! Temporary script files.
//!
//! Every execution writes its source to a fresh file named
//! `script_<millis>_<random>.<ext>`, so concurrent or rapid successive runs
//! never share a path. The file is removed when the [`ScriptFile`] is
//! removed or dropped.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::TempPath;

use crate::language::ScriptLanguage;

use super::executor::ScriptError;

/// A script written to disk, owned by exactly one execution.
#[derive(Debug)]
pub struct ScriptFile {
    path: TempPath,
}

impl ScriptFile {
    /// Write `code` as UTF-8, byte for byte, into a new file in `dir`
    /// (the system temp directory when `None`).
    ///
    /// A partially written file is deleted before the error is returned.
    pub fn create(
        dir: Option<&Path>,
        code: &str,
        language: ScriptLanguage,
    ) -> Result<Self, ScriptError> {
        let dir = match dir {
            Some(dir) => std::path::absolute(dir).map_err(ScriptError::Materialize)?,
            None => std::env::temp_dir(),
        };
        let prefix = format!("script_{}_", Utc::now().timestamp_millis());
        let suffix = format!(".{}", language.extension());

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(ScriptError::Materialize)?;

        // On error `file` is dropped here, which deletes it.
        file.write_all(code.as_bytes())
            .and_then(|()| file.flush())
            .map_err(ScriptError::Materialize)?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// Absolute path of the script.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Failures are logged and swallowed.
    pub fn remove(self) {
        let path: PathBuf = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed script file"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove script file")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_code_verbatim_with_extension() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let code = "println(\"héllo\")\r\n  // no trailing newline";
        let script =
            ScriptFile::create(Some(dir.path()), code, ScriptLanguage::Kotlin).expect("create");

        assert_eq!(script.path().extension().and_then(|e| e.to_str()), Some("kts"));
        assert!(script.path().is_absolute());
        let name = script.path().file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("script_"), "unexpected name {name}");
        assert_eq!(std::fs::read_to_string(script.path()).expect("read"), code);
    }

    #[test]
    fn swift_scripts_use_swift_extension() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = ScriptFile::create(Some(dir.path()), "print(1)", ScriptLanguage::Swift)
            .expect("create");
        assert_eq!(script.path().extension().and_then(|e| e.to_str()), Some("swift"));
    }

    #[test]
    fn rapid_runs_get_distinct_paths() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a = ScriptFile::create(Some(dir.path()), "1", ScriptLanguage::Kotlin).expect("a");
        let b = ScriptFile::create(Some(dir.path()), "1", ScriptLanguage::Kotlin).expect("b");
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn remove_deletes_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script =
            ScriptFile::create(Some(dir.path()), "x", ScriptLanguage::Kotlin).expect("create");
        let path = script.path().to_path_buf();
        assert!(path.exists());
        script.remove();
        assert!(!path.exists());
    }

    #[test]
    fn drop_deletes_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script =
            ScriptFile::create(Some(dir.path()), "x", ScriptLanguage::Swift).expect("create");
        let path = script.path().to_path_buf();
        drop(script);
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_a_materialize_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let missing = dir.path().join("does-not-exist");
        let err = ScriptFile::create(Some(&missing), "x", ScriptLanguage::Kotlin).unwrap_err();
        assert!(matches!(err, ScriptError::Materialize(_)));
        assert!(err.to_string().starts_with("Failed to write script file:"));
    }
}
