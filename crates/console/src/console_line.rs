//! Console-ready lines built from execution events.

use scriptrunner_core::output::{LinkRange, ScriptOutput};

/// How a console line is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Standard output.
    Normal,
    /// Standard error and infrastructure errors.
    Error,
    /// Exit status and session messages.
    System,
}

/// One line in the output pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub text: String,
    pub kind: LineKind,
    pub link_range: Option<LinkRange>,
    pub target_line_number: Option<u32>,
}

impl ConsoleLine {
    pub fn new(text: impl Into<String>, kind: LineKind) -> Self {
        Self {
            text: text.into(),
            kind,
            link_range: None,
            target_line_number: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(text, LineKind::System)
    }

    /// The clickable part of the text, if the line links to a source line.
    pub fn link_text(&self) -> Option<&str> {
        self.text.get(self.link_range.clone()?)
    }
}

impl From<&ScriptOutput> for ConsoleLine {
    fn from(output: &ScriptOutput) -> Self {
        match output {
            ScriptOutput::Line {
                text,
                is_stderr,
                link_range,
                target_line_number,
            } => Self {
                text: text.clone(),
                kind: if *is_stderr {
                    LineKind::Error
                } else {
                    LineKind::Normal
                },
                link_range: link_range.clone(),
                target_line_number: *target_line_number,
            },
            ScriptOutput::Error { message } => Self::new(message.clone(), LineKind::Error),
            ScriptOutput::Exit { code } => {
                Self::system(format!("Process finished with exit code {code}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
