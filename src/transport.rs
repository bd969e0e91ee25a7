//! Transport layer
//!
//! Owns the physical byte stream under exclusive access. The trait is the
//! seam between protocol logic and hardware so the dispatch cycle can be
//! exercised against a scripted mock.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialPortType, SerialStream};
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// Byte-stream transport used by the dispatcher.
///
/// All operations may fail with [`LinkError::Transport`]; such a fault is
/// fatal for the in-flight operation and is surfaced to the caller rather
/// than retried internally.
#[async_trait]
pub trait Transport: Send {
    /// Write the whole buffer to the device.
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Non-blocking read: returns whatever is currently buffered, possibly
    /// nothing (`Ok(0)`).
    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Drop any bytes received before a new request, so a stale unread
    /// reply cannot satisfy the next request's wait.
    async fn discard_input(&mut self) -> Result<()>;
}

/// Serial transport over a [`tokio_serial::SerialStream`].
#[derive(Debug)]
pub struct SerialTransport {
    port: SerialStream,
    path: String,
}

impl SerialTransport {
    /// Open the serial device described by `config`.
    pub fn open(config: &LinkConfig) -> Result<Self> {
        config.validate()?;

        debug!("Opening serial port: {}", config.port);
        let mut port = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(config.parse_data_bits())
            .stop_bits(config.parse_stop_bits())
            .parity(config.parse_parity())
            .timeout(config.read_timeout)
            .open_native_async()
            .map_err(|e| {
                LinkError::transport(format!("Failed to open serial port {}: {e}", config.port))
            })?;

        #[cfg(unix)]
        port.set_exclusive(false)
            .map_err(|e| LinkError::transport(format!("Failed to set exclusive mode: {e}")))?;

        info!("Serial port opened: {} at {} baud", config.port, config.baud_rate);
        Ok(Self {
            port,
            path: config.port.clone(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .await
            .map_err(|e| LinkError::transport(format!("Serial write error on {}: {e}", self.path)))?;
        self.port
            .flush()
            .await
            .map_err(|e| LinkError::transport(format!("Serial flush error on {}: {e}", self.path)))
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        // Mirrors the poll-what's-pending discipline of the reply waiter:
        // never block here, the waiter owns the pacing.
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|e| LinkError::transport(format!("Serial status error on {}: {e}", self.path)))?;
        if pending == 0 {
            return Ok(0);
        }

        let n = self
            .port
            .read(buf)
            .await
            .map_err(|e| LinkError::transport(format!("Serial read error on {}: {e}", self.path)))?;
        Ok(n)
    }

    async fn discard_input(&mut self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| LinkError::transport(format!("Serial clear error on {}: {e}", self.path)))
    }
}

/// Find the first serial port that looks like the controller's USB bridge.
///
/// Matches USB serial devices (CP210x and friends enumerate as
/// `SerialPortType::UsbPort`) or a `ttyUSB` path as a fallback.
pub fn find_usb_port() -> Option<String> {
    let ports = tokio_serial::available_ports().ok()?;
    ports
        .into_iter()
        .find(|p| {
            matches!(p.port_type, SerialPortType::UsbPort(_)) || p.port_name.contains("ttyUSB")
        })
        .map(|p| p.port_name)
}
