//! Terminal rendering of console lines.

use std::io::{self, Write};

use crate::console_line::{ConsoleLine, LineKind};

/// Text printed for a line, with a `[line N]` marker when it links to the
/// script source.
pub fn format_line(line: &ConsoleLine) -> String {
    match line.target_line_number {
        Some(n) => format!("{} [line {n}]", line.text),
        None => line.text.clone(),
    }
}

/// Incrementally prints console lines as the session state grows.
///
/// Errors go to `err`, everything else to `out`. Lines are tracked per
/// run, so a new run starts over from its first line.
#[derive(Debug)]
pub struct Renderer<O, E> {
    out: O,
    err: E,
    run: u64,
    printed: usize,
}

impl<O: Write, E: Write> Renderer<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            run: 0,
            printed: 0,
        }
    }

    /// Print every line of `run` not printed yet.
    pub fn render(&mut self, run: u64, lines: &[ConsoleLine]) -> io::Result<()> {
        if run != self.run || lines.len() < self.printed {
            self.run = run;
            self.printed = 0;
        }
        for line in &lines[self.printed..] {
            let text = format_line(line);
            match line.kind {
                LineKind::Error => writeln!(self.err, "{text}")?,
                LineKind::Normal | LineKind::System => writeln!(self.out, "{text}")?,
            }
        }
        self.printed = lines.len();
        self.out.flush()?;
        self.err.flush()
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(text: &str, range: std::ops::Range<usize>, line: u32) -> ConsoleLine {
        ConsoleLine {
            text: text.to_string(),
            kind: LineKind::Error,
            link_range: Some(range),
            target_line_number: Some(line),
        }
    }

    #[test]
    fn plain_line_is_unchanged() {
        assert_eq!(format_line(&ConsoleLine::new("hello", LineKind::Normal)), "hello");
    }

    #[test]
    fn linked_line_gets_marker() {
        let line = linked("script.kts:5:10: error: boom", 0..16, 5);
        assert_eq!(format_line(&line), "script.kts:5:10: error: boom [line 5]");
    }

    #[test]
    fn splits_streams_and_prints_incrementally() {
        let mut renderer = Renderer::new(Vec::new(), Vec::new());
        let mut lines = vec![
            ConsoleLine::new("out", LineKind::Normal),
            linked("    at Script.main(script.kts:3)", 19..31, 3),
        ];
        renderer.render(1, &lines).unwrap();

        lines.push(ConsoleLine::system("Process finished with exit code 1"));
        renderer.render(1, &lines).unwrap();

        let (out, err) = renderer.into_inner();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "out\nProcess finished with exit code 1\n"
        );
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "    at Script.main(script.kts:3) [line 3]\n"
        );
    }

    #[test]
    fn restarts_on_a_new_run() {
        let mut renderer = Renderer::new(Vec::new(), Vec::new());
        let first = [
            ConsoleLine::new("a", LineKind::Normal),
            ConsoleLine::new("b", LineKind::Normal),
        ];
        renderer.render(1, &first).unwrap();
        let second = [
            ConsoleLine::new("c", LineKind::Normal),
            ConsoleLine::new("d", LineKind::Normal),
            ConsoleLine::new("e", LineKind::Normal),
        ];
        renderer.render(2, &second).unwrap();

        let (out, _) = renderer.into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\nc\nd\ne\n");
    }
}
