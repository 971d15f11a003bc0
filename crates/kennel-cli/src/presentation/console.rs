//! Console output rendering.

use std::io::Write;
use tokio::sync::mpsc;

/// Chunks buffered for a terminal listener before it counts as lagging.
pub const CONSOLE_QUEUE: usize = 1024;

/// Copy listener chunks to stdout until the sending side goes away.
pub async fn print_chunks(mut rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(chunk) = rx.recv().await {
        let mut out = std::io::stdout().lock();
        if out.write_all(&chunk).and_then(|()| out.flush()).is_err() {
            break;
        }
    }
}

/// Print buffered console lines.
pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
