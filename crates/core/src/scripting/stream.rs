//! Cold, cancellable stream of [`ScriptOutput`] events.
//!
//! An [`OutputStream`] wraps a producer future that is spawned onto the
//! tokio runtime the first time the stream is polled. The producer pushes
//! events through an [`OutputSink`] into an unbounded channel, so a slow
//! consumer never stalls pipe reads. The consumer owns the cancellation
//! token: calling [`OutputStream::cancel`] or dropping the stream tells the
//! producer to stop, kill its process and clean up.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::output::{ScriptOutput, EXIT_CODE_INFRASTRUCTURE_FAILURE};

use super::executor::ScriptError;

type Producer = Box<dyn FnOnce(OutputSink, CancellationToken) -> BoxFuture<'static, ()> + Send>;

type Mapper = Box<dyn Fn(ScriptOutput) -> ScriptOutput + Send>;

// ---------------------------------------------------------------------------
// OutputSink
// ---------------------------------------------------------------------------

/// Producer-side handle for pushing events into an [`OutputStream`].
///
/// Cheap to clone; each pipe reader holds its own copy. Once an `Exit` has
/// been emitted every further event is rejected.
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: mpsc::UnboundedSender<ScriptOutput>,
    terminated: Arc<AtomicBool>,
}

impl OutputSink {
    fn new(tx: mpsc::UnboundedSender<ScriptOutput>) -> Self {
        Self {
            tx,
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Push one event. Returns `false` if the stream already terminated or
    /// the consumer has gone away.
    pub fn emit(&self, output: ScriptOutput) -> bool {
        if output.is_exit() {
            if self.terminated.swap(true, Ordering::AcqRel) {
                return false;
            }
        } else if self.terminated.load(Ordering::Acquire) {
            return false;
        }
        self.tx.send(output).is_ok()
    }

    /// Whether an `Exit` event has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Whether the consuming [`OutputStream`] has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// OutputStream
// ---------------------------------------------------------------------------

enum State {
    /// Not yet polled; nothing has run.
    Pending(Producer),
    Running(mpsc::UnboundedReceiver<ScriptOutput>),
    Finished,
}

/// Ordered, asynchronous, cancellable sequence of execution events.
///
/// No event is yielded after `Exit`, and none after cancellation.
pub struct OutputStream {
    state: State,
    cancel: CancellationToken,
    mapper: Option<Mapper>,
    task: Option<JoinHandle<()>>,
}

impl OutputStream {
    /// Wrap a producer. It does not run until the stream is first polled.
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(OutputSink, CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let producer: Producer = Box::new(move |sink, cancel| producer(sink, cancel).boxed());
        Self {
            state: State::Pending(producer),
            cancel: CancellationToken::new(),
            mapper: None,
            task: None,
        }
    }

    /// A stream that replays `outputs` in order.
    pub fn from_outputs(outputs: Vec<ScriptOutput>) -> Self {
        Self::new(move |sink, _cancel| async move {
            for output in outputs {
                if !sink.emit(output) {
                    break;
                }
            }
        })
    }

    /// Apply `f` to every event before it is yielded.
    pub fn map_outputs<F>(mut self, f: F) -> Self
    where
        F: Fn(ScriptOutput) -> ScriptOutput + Send + 'static,
    {
        self.mapper = Some(match self.mapper.take() {
            Some(inner) => Box::new(move |output| f(inner(output))),
            None => Box::new(f),
        });
        self
    }

    /// Signal the producer to stop. Further polls yield `None`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this stream when triggered from elsewhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the producer task has been spawned.
    pub fn is_started(&self) -> bool {
        !matches!(self.state, State::Pending(_))
    }

    /// Cancel and wait until the producer has finished its teardown
    /// (process killed and reaped, temp file removed).
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        self.state = State::Finished;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Script producer task did not finish cleanly");
            }
        }
    }

    fn start(&mut self) {
        if !matches!(self.state, State::Pending(_)) {
            return;
        }
        let State::Pending(producer) = std::mem::replace(&mut self.state, State::Finished) else {
            return;
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = OutputSink::new(tx);
        let work = producer(sink.clone(), self.cancel.clone());
        self.task = Some(tokio::spawn(supervise(work, sink)));
        self.state = State::Running(rx);
    }
}

impl Stream for OutputStream {
    type Item = ScriptOutput;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            this.state = State::Finished;
            return Poll::Ready(None);
        }
        this.start();

        let State::Running(rx) = &mut this.state else {
            return Poll::Ready(None);
        };

        match rx.poll_recv(cx) {
            Poll::Ready(Some(output)) => {
                if this.cancel.is_cancelled() {
                    this.state = State::Finished;
                    return Poll::Ready(None);
                }
                if output.is_exit() {
                    this.state = State::Finished;
                }
                let output = match &this.mapper {
                    Some(map) => map(output),
                    None => output,
                };
                Poll::Ready(Some(output))
            }
            Poll::Ready(None) => {
                this.state = State::Finished;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        // Discarding the stream is how the consumer says "stop".
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Pending(_) => "pending",
            State::Running(_) => "running",
            State::Finished => "finished",
        };
        f.debug_struct("OutputStream")
            .field("state", &state)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Run the producer, turning a panic into an `Error` + `Exit` pair.
async fn supervise(work: BoxFuture<'static, ()>, sink: OutputSink) {
    if let Err(panic) = AssertUnwindSafe(work).catch_unwind().await {
        let detail = panic_detail(panic.as_ref());
        tracing::error!(error = %detail, "Script producer panicked");
        if !sink.is_terminated() {
            sink.emit(ScriptOutput::error(ScriptError::Unexpected(detail).to_string()));
            sink.emit(ScriptOutput::exit(EXIT_CODE_INFRASTRUCTURE_FAILURE));
        }
    }
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
