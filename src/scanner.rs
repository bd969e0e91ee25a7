//! Frame scanner
//!
//! Accumulates raw transport bytes and extracts validated frames. Recovery
//! policy: on any invalid position, drop exactly one leading byte and
//! rescan. This recovers from any single injected or missing byte without
//! losing subsequent valid frames.

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::constants::READ_BUFFER_SIZE;
use crate::frame::{self, Decode, Frame};

/// Incremental scanner over a growing byte buffer.
#[derive(Debug, Default)]
pub struct FrameScanner {
    buf: BytesMut,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Append freshly read transport bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Drop everything buffered so far (stale input before a new request).
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Extract the next validated frame, discarding garbage along the way.
    /// Returns `None` once the remaining bytes cannot yet form a frame.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match frame::decode(&self.buf) {
                Decode::Complete { frame, consumed } => {
                    self.buf.advance(consumed);
                    return Some(frame);
                }
                Decode::Invalid => {
                    trace!("dropping one byte (0x{:02X}) to resync", self.buf[0]);
                    self.buf.advance(1);
                }
                Decode::Incomplete => return None,
            }
        }
    }
}
