//! Source-location detection for script output lines.
//!
//! Recognises compiler diagnostics (`script.kts:5:10: error: ...`) and
//! runtime stack frames (`at Script.main(script.kts:3)`) so the console can
//! render a clickable span that jumps to the referenced line.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::output::{LinkRange, ScriptOutput};

/// `<anything>:<line>:<column>:` anchored at the start of the line.
pub const COMPILE_DIAGNOSTIC_PATTERN: &str = r"^(.+?):(\d+):(\d+):";

/// `(<file>.kts:<line>)` or `(<file>.swift:<line>)` anywhere in the line.
pub const STACK_FRAME_PATTERN: &str = r"\(([^()]+?\.(?:kts|swift)):(\d+)\)";

static COMPILE_DIAGNOSTIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COMPILE_DIAGNOSTIC_PATTERN).expect("valid regex"));

static STACK_FRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(STACK_FRAME_PATTERN).expect("valid regex"));

/// A source location found in an output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Byte span of the clickable text.
    pub link_range: LinkRange,
    /// 1-indexed line in the submitted script.
    pub line_number: u32,
}

/// Find the source location referenced by `text`, if any.
///
/// The compile-diagnostic pattern wins over the stack-frame pattern; at most
/// one location is reported per line. A line that matches the compile
/// pattern with an invalid line number has no location at all.
pub fn locate(text: &str) -> Option<SourceLocation> {
    match COMPILE_DIAGNOSTIC_RE.captures(text) {
        Some(caps) => compile_diagnostic(&caps),
        None => stack_frame(text),
    }
}

/// Attach link information to a `Line` event. Other events pass through.
///
/// Annotation is computed from the text alone, so re-annotating an already
/// annotated line yields the same result.
pub fn annotate(output: ScriptOutput) -> ScriptOutput {
    match output {
        ScriptOutput::Line {
            text, is_stderr, ..
        } => {
            let location = locate(&text);
            ScriptOutput::Line {
                link_range: location.as_ref().map(|l| l.link_range.clone()),
                target_line_number: location.map(|l| l.line_number),
                text,
                is_stderr,
            }
        }
        other => other,
    }
}

fn compile_diagnostic(caps: &Captures<'_>) -> Option<SourceLocation> {
    let line_number = parse_line_number(caps.get(2)?.as_str())?;
    Some(SourceLocation {
        link_range: 0..caps.get(0)?.end(),
        line_number,
    })
}

fn stack_frame(text: &str) -> Option<SourceLocation> {
    let caps = STACK_FRAME_RE.captures(text)?;
    let file = caps.get(1)?;
    let line = caps.get(2)?;
    let line_number = parse_line_number(line.as_str())?;
    Some(SourceLocation {
        link_range: file.start()..line.end(),
        line_number,
    })
}

fn parse_line_number(digits: &str) -> Option<u32> {
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
