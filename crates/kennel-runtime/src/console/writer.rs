//! Line-framing multiplexer between a process and its console sinks.
//!
//! Workloads can emit non-UTF-8 bytes, so output is read as bytes up to each
//! newline and decoded lossily; a bad byte never ends the stream.

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{BroadcastHub, ConsoleBuffer, ConsoleSink};

/// Echoes console output to the daemon's own stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ConsoleSink for StdoutSink {
    fn write(&self, chunk: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(chunk);
        let _ = stdout.flush();
    }
}

/// Frames raw output into lines and fans each one out to every sink.
pub struct OutputWriter {
    sinks: Vec<Arc<dyn ConsoleSink>>,
}

impl OutputWriter {
    pub fn new(sinks: Vec<Arc<dyn ConsoleSink>>) -> Self {
        Self { sinks }
    }

    /// Writer feeding `buffer` and `hub`, plus stdout when `forward` is set.
    pub fn for_console(buffer: Arc<ConsoleBuffer>, hub: Arc<BroadcastHub>, forward: bool) -> Self {
        let mut sinks: Vec<Arc<dyn ConsoleSink>> = vec![buffer as Arc<dyn ConsoleSink>, hub];
        if forward {
            sinks.push(Arc::new(StdoutSink));
        }
        Self::new(sinks)
    }

    /// Write one line, with any trailing `\n` or `\r\n` replaced by a single
    /// `\n`.
    pub fn write_line(&self, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let mut framed = String::from_utf8_lossy(raw).into_owned();
        framed.push('\n');
        for sink in &self.sinks {
            sink.write(framed.as_bytes());
        }
    }

    /// Pump an async stream into the sinks until end-of-stream.
    pub fn spawn_reader(
        self: &Arc<Self>,
        stream: impl AsyncRead + Unpin + Send + 'static,
        stream_type: &'static str,
    ) -> JoinHandle<()> {
        let writer = Arc::clone(self);
        tokio::spawn(async move {
            let mut reader = tokio::io::BufReader::new(stream);
            let mut buf: Vec<u8> = Vec::with_capacity(1024);

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => writer.write_line(&buf),
                    Err(e) => {
                        debug!(%stream_type, error = %e, "console reader exiting due to read error");
                        break;
                    }
                }
            }

            debug!(%stream_type, "console reader task exiting");
        })
    }

    /// Blocking variant of [`spawn_reader`](Self::spawn_reader) for readers
    /// that have no async form, such as a PTY master. Returns at
    /// end-of-stream or on the first hard read error.
    pub fn copy_blocking(&self, reader: impl Read) {
        let mut reader = BufReader::new(reader);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => self.write_line(&buf),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    // Linux reports EIO on the master once the child side closes.
                    debug!(error = %e, "pty reader exiting");
                    if !buf.is_empty() {
                        self.write_line(&buf);
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Vec<u8>>>);

    impl ConsoleSink for Collect {
        fn write(&self, chunk: &[u8]) {
            self.0.lock().unwrap().push(chunk.to_vec());
        }
    }

    #[test]
    fn test_write_line_normalises_terminators() {
        let sink = Arc::new(Collect::default());
        let writer = OutputWriter::new(vec![Arc::clone(&sink) as Arc<dyn ConsoleSink>]);

        writer.write_line(b"crlf\r\n");
        writer.write_line(b"bare");

        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![b"crlf\n".to_vec(), b"bare\n".to_vec()]
        );
    }

    #[test]
    fn test_copy_blocking_frames_partial_last_line() {
        let buffer = Arc::new(ConsoleBuffer::default());
        let hub = Arc::new(BroadcastHub::new());
        let writer = OutputWriter::for_console(Arc::clone(&buffer), hub, false);

        writer.copy_blocking(&b"one\r\ntwo\nthree"[..]);

        assert_eq!(buffer.read().lines, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_spawn_reader_survives_invalid_utf8() {
        let buffer = Arc::new(ConsoleBuffer::default());
        let writer = Arc::new(OutputWriter::for_console(
            Arc::clone(&buffer),
            Arc::new(BroadcastHub::new()),
            false,
        ));

        writer
            .spawn_reader(&b"bad \xff\nstill here\n"[..], "stdout")
            .await
            .unwrap();

        assert_eq!(buffer.read().lines, vec!["bad \u{fffd}", "still here"]);
    }
}
