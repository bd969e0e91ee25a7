//! Packet codec
//!
//! Pure encode/decode of the wire format; no I/O, no state. Decoding is
//! written so the scanner can resynchronize past corruption: any rejection
//! costs exactly one leading byte, never a whole presumed frame, which
//! tolerates a corrupted length byte that would otherwise desynchronize
//! the stream.

use crate::constants::{FRAME_HEADER_LEN, FRAME_OVERHEAD, MAX_PAYLOAD_LEN, SYNC_BYTE};
use crate::error::{LinkError, Result};

/// One complete, checksum-validated wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Request or reply code
    pub opcode: u8,
    /// Opcode-specific payload
    pub payload: Vec<u8>,
}

/// Outcome of attempting to parse one frame at the start of a buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum Decode {
    /// A valid frame occupying `consumed` leading bytes.
    Complete { frame: Frame, consumed: usize },
    /// Not enough bytes yet; read more and retry.
    Incomplete,
    /// Byte 0 is not a sync byte, or the checksum failed. Drop exactly one
    /// byte and retry.
    Invalid,
}

/// Additive checksum over the given bytes, truncated to 8 bits.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Encode one frame: sync + opcode + length + payload + checksum.
pub fn encode(opcode: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(LinkError::PayloadTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    frame.push(SYNC_BYTE);
    frame.push(opcode);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame));
    Ok(frame)
}

/// Attempt to parse one frame starting at offset 0 of `buf`.
pub fn decode(buf: &[u8]) -> Decode {
    if buf.len() < FRAME_OVERHEAD {
        return Decode::Incomplete;
    }

    if buf[0] != SYNC_BYTE {
        return Decode::Invalid;
    }

    let length = buf[2] as usize;
    let total = FRAME_HEADER_LEN + length + 1;
    if buf.len() < total {
        return Decode::Incomplete;
    }

    let expected = checksum(&buf[..total - 1]);
    if buf[total - 1] != expected {
        return Decode::Invalid;
    }

    Decode::Complete {
        frame: Frame {
            opcode: buf[1],
            payload: buf[FRAME_HEADER_LEN..FRAME_HEADER_LEN + length].to_vec(),
        },
        consumed: total,
    }
}
