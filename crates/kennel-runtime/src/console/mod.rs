//! Console plumbing shared by every environment.
//!
//! Process output flows through an [`OutputWriter`], which frames it into
//! lines and hands each line to a set of [`ConsoleSink`]s: the replay
//! [`ConsoleBuffer`], the live [`BroadcastHub`] and optionally the daemon's
//! own stdout.

mod buffer;
mod hub;
mod writer;

pub use buffer::{ConsoleBuffer, DEFAULT_CAPACITY};
pub use hub::BroadcastHub;
pub use writer::{OutputWriter, StdoutSink};

/// Destination for framed console output.
///
/// Chunks always end with `\n`. Sinks must not block.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, chunk: &[u8]);
}
