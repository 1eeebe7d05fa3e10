//! Line-by-line draining of process pipes.
//!
//! One [`pump_lines`] future runs per pipe; the process executor polls the
//! stdout and stderr pumps together so a backlog on one pipe never stops
//! the other from draining. Lines are forwarded as soon as they are read.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;

use crate::annotate::annotate;
use crate::output::ScriptOutput;

use super::executor::ScriptError;
use super::stream::OutputSink;

/// Which process pipe a pump reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipe {
    Stdout,
    Stderr,
}

impl Pipe {
    pub fn name(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    pub fn is_stderr(self) -> bool {
        self == Self::Stderr
    }
}

/// How a pump finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpEnd {
    /// The pipe reached end-of-stream.
    Eof,
    /// Cancellation was observed, or the consumer went away.
    Cancelled,
}

/// Forward every line of `pipe` to `sink` as a `Line` event.
///
/// Cancellation is checked before and after each read; once it is observed
/// no further lines are emitted. Invalid UTF-8 is replaced rather than
/// treated as an error, and a trailing `\n` / `\r\n` is stripped.
pub async fn pump_lines<R>(
    pipe: Option<R>,
    kind: Pipe,
    sink: &OutputSink,
    cancel: &CancellationToken,
) -> Result<PumpEnd, ScriptError>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(PumpEnd::Eof);
    };
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    let mut count: u64 = 0;

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(PumpEnd::Cancelled),
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        let n = read.map_err(|source| ScriptError::Read {
            pipe: kind.name(),
            source,
        })?;
        if n == 0 {
            tracing::debug!(pipe = kind.name(), lines = count, "Pipe closed");
            return Ok(PumpEnd::Eof);
        }
        if cancel.is_cancelled() {
            return Ok(PumpEnd::Cancelled);
        }

        let line = ScriptOutput::line(decode_line(&buf), kind.is_stderr());
        if !sink.emit(annotate(line)) {
            tracing::debug!(pipe = kind.name(), "Output consumer gone, stopping pump");
            return Ok(PumpEnd::Cancelled);
        }
        count += 1;
    }
}

/// Lossy UTF-8 decode with the line terminator removed.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::scripting::stream::OutputStream;

    /// Pump `input` through a fresh stream and collect what comes out.
    async fn pump_bytes(input: &'static [u8], kind: Pipe) -> (Vec<ScriptOutput>, PumpEnd) {
        let (end_tx, end_rx) = tokio::sync::oneshot::channel();
        let stream = OutputStream::new(move |sink, cancel| async move {
            let end = pump_lines(Some(input), kind, &sink, &cancel).await.expect("pump");
            let _ = end_tx.send(end);
        });
        let lines: Vec<_> = stream.collect().await;
        (lines, end_rx.await.expect("end"))
    }

    #[test]
    fn decode_strips_terminators() {
        assert_eq!(decode_line(b"abc\n"), "abc");
        assert_eq!(decode_line(b"abc\r\n"), "abc");
        assert_eq!(decode_line(b"abc"), "abc");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn decode_replaces_invalid_utf8() {
        assert_eq!(decode_line(b"a\xffb\n"), "a\u{fffd}b");
    }

    #[test]
    fn pipe_names() {
        assert_eq!(Pipe::Stdout.name(), "stdout");
        assert!(Pipe::Stderr.is_stderr());
        assert!(!Pipe::Stdout.is_stderr());
    }

    #[tokio::test]
    async fn forwards_lines_in_order() {
        let (lines, end) = pump_bytes(b"one\ntwo\r\nthree", Pipe::Stdout).await;
        assert_eq!(end, PumpEnd::Eof);
        assert_eq!(
            lines,
            vec![
                ScriptOutput::line("one", false),
                ScriptOutput::line("two", false),
                ScriptOutput::line("three", false),
            ]
        );
    }

    #[tokio::test]
    async fn stderr_lines_are_tagged_and_annotated() {
        let (lines, _) = pump_bytes(b"script.kts:2:1: error: boom\n", Pipe::Stderr).await;
        assert_eq!(
            lines,
            vec![ScriptOutput::Line {
                text: "script.kts:2:1: error: boom".to_string(),
                is_stderr: true,
                link_range: Some(0..15),
                target_line_number: Some(2),
            }]
        );
    }

    #[tokio::test]
    async fn missing_pipe_is_immediate_eof() {
        let stream = OutputStream::new(|sink, cancel| async move {
            let end = pump_lines(None::<&[u8]>, Pipe::Stdout, &sink, &cancel)
                .await
                .expect("pump");
            assert_eq!(end, PumpEnd::Eof);
        });
        let lines: Vec<_> = stream.collect().await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn cancelled_pump_emits_nothing() {
        let (end_tx, end_rx) = tokio::sync::oneshot::channel();
        let mut stream = OutputStream::new(move |sink, cancel| async move {
            cancel.cancel();
            let end = pump_lines(Some(&b"never\n"[..]), Pipe::Stdout, &sink, &cancel)
                .await
                .expect("pump");
            let _ = end_tx.send(end);
        });
        let token = stream.cancellation_token();
        // Start the producer; it cancels itself before reading.
        assert_eq!(stream.next().await, None);
        assert!(token.is_cancelled());
        drop(stream);
        assert_eq!(end_rx.await.expect("end"), PumpEnd::Cancelled);
    }
}
