//! Sentinel framing of the merged output stream.
//!
//! ExifTool prints `{ready}` on its own line after finishing each `-execute`
//! block. Everything written since the previous sentinel, data and
//! diagnostics alike, is one frame.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Error, Result};

/// Marker ExifTool prints when a command block completes.
pub const READY_TOKEN: &[u8] = b"{ready}";

/// Find the first complete sentinel in `buf`.
///
/// Returns `(payload_len, consumed)`: the payload is `buf[..payload_len]` and
/// `consumed` covers the payload, the token and its line ending. A token whose
/// line ending has not arrived yet is not complete.
pub fn find_frame(buf: &[u8]) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(offset) = find_subslice(&buf[from..], READY_TOKEN) {
        let start = from + offset;
        let after = start + READY_TOKEN.len();
        match &buf[after..] {
            [b'\n', ..] => return Some((start, after + 1)),
            [b'\r', b'\n', ..] => return Some((start, after + 2)),
            [] | [b'\r'] => return None,
            // "{ready}" inside data, keep looking
            _ => from = after,
        }
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Splits a byte stream into frames at the ready sentinel.
///
/// Bytes after a sentinel are retained for the next frame.
pub struct FrameReader<R> {
    reader: R,
    buf: Vec<u8>,
    max_frame: usize,
    // Prefix of `buf` already searched without finding a sentinel
    scanned: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a framer that holds at most `max_frame` bytes of payload.
    pub fn new(reader: R, max_frame: usize) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(max_frame.min(4096)),
            max_frame,
            scanned: 0,
            eof: false,
        }
    }

    /// Read the next frame payload.
    ///
    /// Returns `Ok(None)` when the stream ends before another sentinel. Bytes
    /// left over at end of stream are discarded.
    pub async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = [0u8; 8192];
        loop {
            // A sentinel may straddle the scanned boundary
            let from = self.scanned.saturating_sub(READY_TOKEN.len() + 1);
            if let Some((len, consumed)) = find_frame(&self.buf[from..]) {
                let (payload_len, consumed) = (from + len, from + consumed);
                if payload_len > self.max_frame {
                    return Err(Error::FrameTooLarge {
                        limit: self.max_frame,
                    });
                }
                let payload = self.buf[..payload_len].to_vec();
                self.buf.drain(..consumed);
                self.scanned = 0;
                return Ok(Some(payload));
            }
            self.scanned = self.buf.len();

            // Token plus "\r\n" on top of a full payload
            if self.buf.len() > self.max_frame + READY_TOKEN.len() + 2 {
                return Err(Error::FrameTooLarge {
                    limit: self.max_frame,
                });
            }

            if self.eof {
                if !self.buf.is_empty() {
                    tracing::trace!(
                        bytes = self.buf.len(),
                        "discarding unterminated output at end of stream"
                    );
                    self.buf.clear();
                    self.scanned = 0;
                }
                return Ok(None);
            }

            let n = self.reader.read(&mut chunk).await.map_err(Error::Scan)?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }

    /// Bytes buffered past the last returned frame.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }
}
