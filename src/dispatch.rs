//! Command dispatcher
//!
//! Runs the full send-wait-retry cycle for one command under exclusive
//! ownership of the transport: discard stale input, write the request
//! frame, let the device settle, then scan incoming bytes for the mapped
//! reply opcode until the reply timeout elapses. A timeout retries the
//! whole cycle; a transport fault aborts it.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use crate::command::{Command, Response};
use crate::config::LinkConfig;
use crate::constants::{READ_BUFFER_SIZE, REPLY_POLL_SLEEP};
use crate::error::{LinkError, Result};
use crate::frame;
use crate::scanner::FrameScanner;
use crate::transport::Transport;

/// Serializes all outbound requests through one transport.
#[derive(Debug)]
pub struct Dispatcher<T: Transport> {
    transport: T,
    scanner: FrameScanner,
    settle_delay: Duration,
    reply_timeout: Duration,
    retries: u32,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, config: &LinkConfig) -> Self {
        Self {
            transport,
            scanner: FrameScanner::new(),
            settle_delay: config.settle_delay,
            reply_timeout: config.reply_timeout,
            retries: config.retries,
        }
    }

    /// Submit one command and resolve it with the matching reply payload,
    /// or [`LinkError::NoReply`] after `retries + 1` attempts.
    pub async fn submit(&mut self, command: &Command) -> Result<Response> {
        let request = frame::encode(command.opcode().request_code(), command.payload())?;

        if !command.expects_reply() {
            self.flush_stale_input().await?;
            self.transport.write_all(&request).await?;
            trace!(
                "TX {} (0x{:02X}, no reply expected)",
                hex::encode(&request),
                command.opcode().request_code()
            );
            return Ok(Response::empty());
        }

        let expected = command.opcode().reply_code();
        let attempts = self.retries + 1;
        for attempt in 1..=attempts {
            self.flush_stale_input().await?;
            self.transport.write_all(&request).await?;
            debug!(
                "TX {} (0x{:02X}, attempt {attempt}/{attempts})",
                hex::encode(&request),
                command.opcode().request_code()
            );

            sleep(self.settle_delay).await;
            if let Some(payload) = self.wait_for_reply(expected).await? {
                return Ok(Response::new(payload));
            }
            warn!(
                "No reply for 0x{:02X} within {:?} (attempt {attempt}/{attempts})",
                command.opcode().request_code(),
                self.reply_timeout
            );
        }

        Err(LinkError::NoReply {
            opcode: command.opcode().request_code(),
            attempts,
        })
    }

    /// Drop bytes buffered by the OS and by the scanner, so a stale unread
    /// reply cannot satisfy this request's wait.
    async fn flush_stale_input(&mut self) -> Result<()> {
        self.transport.discard_input().await?;
        self.scanner.clear();
        Ok(())
    }

    /// Scan incoming bytes until a frame with `expected` arrives or the
    /// reply timeout elapses. Unrelated frames are dropped, not buffered.
    async fn wait_for_reply(&mut self, expected: u8) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + self.reply_timeout;
        let mut chunk = [0u8; READ_BUFFER_SIZE];

        while Instant::now() < deadline {
            let n = self.transport.read_available(&mut chunk).await?;
            if n == 0 {
                sleep(REPLY_POLL_SLEEP).await;
                continue;
            }

            trace!("RX {}", hex::encode(&chunk[..n]));
            self.scanner.extend(&chunk[..n]);
            while let Some(reply) = self.scanner.next_frame() {
                if reply.opcode == expected {
                    return Ok(Some(reply.payload));
                }
                debug!(
                    "Discarding unrelated frame 0x{:02X} while waiting for 0x{expected:02X}",
                    reply.opcode
                );
            }
        }
        Ok(None)
    }
}
