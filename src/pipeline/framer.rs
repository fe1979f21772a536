//! Newline framing over an arbitrarily chunked byte stream.
//!
//! Accumulation is byte-based: a chunk may end in the middle of a multi-byte UTF-8 sequence
//! and the framer never looks at the text until a `\n` completes the line.

use bytes::Bytes;
use bytes::BytesMut;
use tracing::warn;

const NEWLINE: u8 = b'\n';

/// Splits a chunked byte stream into complete lines.
///
/// The unterminated tail (the pending fragment) is kept across calls to
/// [`LineFramer::feed`] and only ever leaves the framer as part of a completed line.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: BytesMut,
    /// 0 means unlimited
    max_line_bytes: usize,
    /// Set while skipping the rest of an over-length line
    discarding: bool,
    discarded: u64,
}

impl LineFramer {
    /// Framer without a line length cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Framer that drops any line longer than `max_line_bytes` (0 disables the cap).
    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            ..Self::default()
        }
    }

    /// Appends `chunk` and returns every line it completed, in order, without terminators.
    pub fn feed(
        &mut self,
        chunk: &[u8],
    ) -> Vec<Bytes> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == NEWLINE) {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                // terminator of an over-length line: resume normal framing
                self.discarding = false;
                continue;
            }
            if self.exceeds_cap(head.len()) {
                self.drop_pending();
                continue;
            }

            self.pending.extend_from_slice(head);
            lines.push(self.pending.split().freeze());
        }

        if !rest.is_empty() && !self.discarding {
            if self.exceeds_cap(rest.len()) {
                self.drop_pending();
                self.discarding = true;
            } else {
                self.pending.extend_from_slice(rest);
            }
        }

        lines
    }

    /// Bytes currently held as the pending fragment.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of over-length lines dropped so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drops the pending fragment, returning how many bytes were lost.
    pub fn reset(&mut self) -> usize {
        let lost = self.pending.len();
        self.pending.clear();
        self.discarding = false;
        lost
    }

    fn exceeds_cap(
        &self,
        incoming: usize,
    ) -> bool {
        self.max_line_bytes != 0 && self.pending.len() + incoming > self.max_line_bytes
    }

    fn drop_pending(&mut self) {
        self.discarded += 1;
        warn!(
            cap = self.max_line_bytes,
            buffered = self.pending.len(),
            "line exceeds max_line_bytes, dropping it"
        );
        self.pending.clear();
    }
}
