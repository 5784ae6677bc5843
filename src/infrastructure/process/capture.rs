//! Bounded background capture of a child's stdout/stderr.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::warn;

const CHUNK_SIZE: usize = 8192;

/// Head and tail of a stream, with a count of the bytes dropped between them.
///
/// Test frameworks print their summary last, so the tail is always kept.
#[derive(Debug)]
struct Captured {
    head: Vec<u8>,
    tail: VecDeque<u8>,
    head_limit: usize,
    tail_limit: usize,
    omitted: usize,
}

impl Captured {
    fn new(max_bytes: usize) -> Self {
        let head_limit = max_bytes / 2;
        Self {
            head: Vec::new(),
            tail: VecDeque::new(),
            head_limit,
            tail_limit: max_bytes - head_limit,
            omitted: 0,
        }
    }

    fn push(&mut self, mut bytes: &[u8]) {
        let room = self.head_limit.saturating_sub(self.head.len());
        if room > 0 {
            let take = bytes.len().min(room);
            self.head.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
        }

        self.tail.extend(bytes);
        let overflow = self.tail.len().saturating_sub(self.tail_limit);
        if overflow > 0 {
            self.tail.drain(..overflow);
            self.omitted += overflow;
        }
    }

    fn text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.head).into_owned();
        if self.omitted > 0 {
            text.push_str(&format!("\n[... {} bytes omitted ...]\n", self.omitted));
        }
        let (front, back) = self.tail.as_slices();
        let mut tail = Vec::with_capacity(self.tail.len());
        tail.extend_from_slice(front);
        tail.extend_from_slice(back);
        text.push_str(&String::from_utf8_lossy(&tail));
        text
    }
}

/// One pipe drained into memory by a background task.
///
/// At most `max_bytes` are held: the first half of the stream and its most
/// recent half. The middle is read and discarded so the child never blocks
/// on a full pipe.
#[derive(Debug)]
pub struct OutputCapture {
    captured: Arc<Mutex<Captured>>,
    reader: JoinHandle<()>,
}

impl OutputCapture {
    pub fn spawn<R>(mut source: R, max_bytes: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let captured = Arc::new(Mutex::new(Captured::new(max_bytes)));
        let sink = Arc::clone(&captured);

        let reader = tokio::spawn(async move {
            let mut chunk = [0u8; CHUNK_SIZE];
            loop {
                let n = match source.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        warn!(error = %e, "output capture read failed");
                        break;
                    }
                };
                sink.lock().await.push(&chunk[..n]);
            }
        });

        Self { captured, reader }
    }

    /// Text captured so far, lossily decoded.
    pub async fn snapshot(&self) -> String {
        self.captured.lock().await.text()
    }

    /// Wait up to `drain` for the pipe to reach EOF, then return the text.
    ///
    /// A grandchild that inherited the pipe can keep it open after the child
    /// died; the reader is aborted in that case.
    pub async fn finish(mut self, drain: Duration) -> String {
        if timeout(drain, &mut self.reader).await.is_err() {
            self.reader.abort();
        }
        self.snapshot().await
    }
}
