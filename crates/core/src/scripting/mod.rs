//! Script execution subsystem.
//!
//! The [`process::ProcessExecutor`] writes the submitted source to a
//! temporary file ([`materialize`]), starts the interpreter ([`launcher`]),
//! drains stdout and stderr concurrently ([`pump`]) and tears everything
//! down on completion or cancellation. Results are delivered through a cold,
//! cancellable [`stream::OutputStream`].

pub mod executor;
pub mod launcher;
pub mod materialize;
pub mod process;
pub mod pump;
pub mod run;
pub mod scripted;
pub mod stream;
