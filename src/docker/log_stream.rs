// ABOUTME: Line-oriented view over an engine byte feed (image pull progress or container output)
// Lazy: the feed is only read when the next line is requested

use super::engine::Feed;
use super::error::LifecycleError;
use futures_util::stream::{Stream, StreamExt};
use futures_util::task::{Context, Poll};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use tracing::debug;

/// A possibly unbounded sequence of text lines read from an engine feed.
///
/// Lines are split on `\n` with a trailing `\r` removed and decoded lossily as
/// UTF-8. A line cut across feed chunks is reassembled; an unterminated last
/// line is still yielded when the feed ends. A feed error is yielded once and
/// ends the stream.
///
/// The underlying feed is released by [`LogStream::close`] or by dropping the
/// stream. A followed container log only ends when the engine closes it.
pub struct LogStream {
    feed: Option<Feed>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
}

impl LogStream {
    pub fn new(feed: Feed) -> Self {
        Self {
            feed: Some(feed),
            buffer: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Wait for the next line; `None` once the feed has closed
    pub async fn next_line(&mut self) -> Option<Result<String, LifecycleError>> {
        self.next().await
    }

    /// Whether the underlying feed has ended or been released
    pub const fn is_closed(&self) -> bool {
        self.feed.is_none()
    }

    /// Release the underlying feed, discarding anything not yet read
    pub fn close(mut self) {
        if self.feed.take().is_some() {
            debug!("Releasing open engine feed");
        }
    }

    fn push_chunk(&mut self, chunk: &[u8]) {
        // Bytes already buffered hold no newline; only the new chunk is scanned
        let mut scan_from = self.buffer.len();
        let mut line_start = 0;
        self.buffer.extend_from_slice(chunk);

        while let Some(offset) = self.buffer[scan_from..].iter().position(|b| *b == b'\n') {
            let end = scan_from + offset;
            self.pending.push_back(decode_line(&self.buffer[line_start..end]));
            line_start = end + 1;
            scan_from = line_start;
        }
        self.buffer.drain(..line_start);
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

impl Stream for LogStream {
    type Item = Result<String, LifecycleError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(line) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }

            let Some(feed) = this.feed.as_mut() else {
                return Poll::Ready(None);
            };

            match futures_util::ready!(feed.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => this.push_chunk(&chunk),
                Some(Err(e)) => {
                    this.feed = None;
                    this.buffer.clear();
                    return Poll::Ready(Some(Err(LifecycleError::Feed(e))));
                }
                None => {
                    this.feed = None;
                    if this.buffer.is_empty() {
                        return Poll::Ready(None);
                    }
                    let last = std::mem::take(&mut this.buffer);
                    return Poll::Ready(Some(Ok(decode_line(&last))));
                }
            }
        }
    }
}

impl fmt::Debug for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStream")
            .field("closed", &self.is_closed())
            .field("buffered_bytes", &self.buffer.len())
            .field("pending_lines", &self.pending.len())
            .finish()
    }
}
