//! Commands, responses and the request/reply opcode table

use crate::frame::Frame;

/// Request opcodes understood by the controller.
///
/// Each request is acknowledged by a reply frame whose opcode is the
/// request code plus 0x70. Code 0x16 (paired light control) is reserved by
/// the firmware and not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Move = 0x10,
    Light = 0x11,
    PlaySound = 0x12,
    MoveStop = 0x13,
    LightStop = 0x14,
    SoundStop = 0x15,
    WaitSensor = 0x17,
    GetSensor = 0x18,
    GetStatus = 0x19,
}

impl Opcode {
    /// Wire code of the request frame.
    pub fn request_code(self) -> u8 {
        self as u8
    }

    /// Wire code of the matching reply frame.
    pub fn reply_code(self) -> u8 {
        match self {
            Opcode::Move => 0x80,
            Opcode::Light => 0x81,
            Opcode::PlaySound => 0x82,
            Opcode::MoveStop => 0x83,
            Opcode::LightStop => 0x84,
            Opcode::SoundStop => 0x85,
            Opcode::WaitSensor => 0x87,
            Opcode::GetSensor => 0x88,
            Opcode::GetStatus => 0x89,
        }
    }
}

/// One framed request, resolved with a [`Response`] or a failure after
/// exhausting retries.
#[derive(Debug, Clone)]
pub struct Command {
    opcode: Opcode,
    payload: Vec<u8>,
    expects_reply: bool,
}

impl Command {
    /// Command that waits for the controller's acknowledging reply.
    pub fn new(opcode: Opcode, payload: Vec<u8>) -> Self {
        Self {
            opcode,
            payload,
            expects_reply: true,
        }
    }

    /// Command written once with no reply wait and no retries.
    pub fn fire_and_forget(opcode: Opcode, payload: Vec<u8>) -> Self {
        Self {
            opcode,
            payload,
            expects_reply: false,
        }
    }

    /// The zero-payload status request issued by the poller.
    pub fn status_request() -> Self {
        Self::new(Opcode::GetStatus, Vec::new())
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn expects_reply(&self) -> bool {
        self.expects_reply
    }
}

/// Payload of the reply frame matched to a submitted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Vec<u8>,
}

impl Response {
    pub(crate) fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    pub(crate) fn empty() -> Self {
        Self {
            payload: Vec::new(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

impl From<Frame> for Response {
    fn from(frame: Frame) -> Self {
        Self {
            payload: frame.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_table_matches_firmware_map() {
        let table = [
            (Opcode::Move, 0x80),
            (Opcode::Light, 0x81),
            (Opcode::PlaySound, 0x82),
            (Opcode::MoveStop, 0x83),
            (Opcode::LightStop, 0x84),
            (Opcode::SoundStop, 0x85),
            (Opcode::WaitSensor, 0x87),
            (Opcode::GetSensor, 0x88),
            (Opcode::GetStatus, 0x89),
        ];
        for (opcode, reply) in table {
            assert_eq!(opcode.reply_code(), reply);
            assert_eq!(opcode.reply_code(), opcode.request_code() + 0x70);
        }
    }

    #[test]
    fn status_request_is_empty_and_acked() {
        let cmd = Command::status_request();
        assert_eq!(cmd.opcode(), Opcode::GetStatus);
        assert!(cmd.payload().is_empty());
        assert!(cmd.expects_reply());
    }
}
