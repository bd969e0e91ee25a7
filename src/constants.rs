//! Wire-format and engine constants
//!
//! The frame layout is fixed by the controller firmware:
//! sync(1) + opcode(1) + length(1) + payload(0..=255) + checksum(1).

use std::time::Duration;

/// Start-of-frame marker. A buffer position not starting with this byte is
/// discarded one byte at a time until a valid sync point is found.
pub const SYNC_BYTE: u8 = 0xA5;

/// Fixed bytes before the payload: sync + opcode + length.
pub const FRAME_HEADER_LEN: usize = 3;

/// Fixed bytes around the payload: header + trailing checksum.
pub const FRAME_OVERHEAD: usize = FRAME_HEADER_LEN + 1;

/// Maximum payload length expressible in the one-byte length field.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Read buffer size for draining the transport.
///
/// Maximum frame is 4 + 255 = 259 bytes; 512 leaves headroom for a reply
/// queued behind stale bytes without a second read pass.
pub const READ_BUFFER_SIZE: usize = 512;

/// Length of a status reply payload (see `DeviceStatus::from_payload`).
pub const STATUS_PAYLOAD_LEN: usize = 10;

/// Sleep between reply-poll passes while waiting for a frame. Short enough
/// for sub-second latency, long enough not to spin a core.
pub const REPLY_POLL_SLEEP: Duration = Duration::from_millis(5);
