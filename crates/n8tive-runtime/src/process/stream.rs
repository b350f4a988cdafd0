//! Async stream line readers (non-UTF8-safe).
//!
//! Child services can emit non-UTF8 bytes on stdout/stderr. Using
//! `BufReader::lines()` would terminate the reader task on invalid UTF-8,
//! so lines are read as bytes and decoded lossily.

use n8tive_core::LogSource;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Spawn a task that calls `on_line` for every line of `stream` until EOF.
///
/// Lines are delivered in order with trailing `\n` / `\r\n` removed.
pub fn spawn_stream_reader<F>(
    stream: impl AsyncRead + Unpin + Send + 'static,
    port: u16,
    source: LogSource,
    mut on_line: F,
) -> JoinHandle<()>
where
    F: FnMut(String) + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }
                    on_line(String::from_utf8_lossy(&buf).into_owned());
                }
                Err(e) => {
                    debug!(
                        port = %port,
                        %source,
                        error = %e,
                        "stream reader exiting due to read error"
                    );
                    break;
                }
            }
        }

        debug!(port = %port, %source, "stream reader task exiting");
    })
}
