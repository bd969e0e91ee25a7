//! Link configuration
//!
//! Serial parameters plus protocol timings, loadable from YAML. Defaults
//! match the controller firmware: 115200 baud 8N1, 0.5 s transport read
//! timeout, 1 s protocol reply timeout, 2 retries, 50 ms status cadence.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Configuration for one controller link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Parity ("none", "even", "odd")
    pub parity: String,
    /// Transport-level read timeout (distinct from `reply_timeout`)
    pub read_timeout: Duration,
    /// Protocol-level wait for a matching reply frame
    pub reply_timeout: Duration,
    /// Pause after a write before scanning for the reply
    pub settle_delay: Duration,
    /// Additional attempts after a reply timeout (total = retries + 1)
    pub retries: u32,
    /// Status poll cadence
    pub poll_interval: Duration,
    /// Depth of the submission queue feeding the owner task
    pub queue_depth: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: "none".to_string(),
            read_timeout: Duration::from_millis(500),
            reply_timeout: Duration::from_secs(1),
            settle_delay: Duration::from_millis(10),
            retries: 2,
            poll_interval: Duration::from_millis(50),
            queue_depth: 32,
        }
    }
}

impl LinkConfig {
    /// Default configuration for the given port path.
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LinkError::config(format!(
                "Failed to read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|e| LinkError::config(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate parameter ranges before opening the port.
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            return Err(LinkError::config("Port path cannot be empty"));
        }
        if self.baud_rate == 0 {
            return Err(LinkError::config("Baud rate must be greater than zero"));
        }
        if ![5, 6, 7, 8].contains(&self.data_bits) {
            return Err(LinkError::config("Data bits must be 5, 6, 7, or 8"));
        }
        if ![1, 2].contains(&self.stop_bits) {
            return Err(LinkError::config("Stop bits must be 1 or 2"));
        }
        if !["none", "even", "odd"].contains(&self.parity.as_str()) {
            return Err(LinkError::config("Parity must be none, even, or odd"));
        }
        if self.reply_timeout.is_zero() {
            return Err(LinkError::config("Reply timeout must be greater than zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(LinkError::config("Poll interval must be greater than zero"));
        }
        if self.queue_depth == 0 {
            return Err(LinkError::config("Queue depth must be greater than zero"));
        }
        Ok(())
    }

    pub(crate) fn parse_data_bits(&self) -> tokio_serial::DataBits {
        match self.data_bits {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        }
    }

    pub(crate) fn parse_stop_bits(&self) -> tokio_serial::StopBits {
        match self.stop_bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        }
    }

    pub(crate) fn parse_parity(&self) -> tokio_serial::Parity {
        match self.parity.as_str() {
            "even" => tokio_serial::Parity::Even,
            "odd" => tokio_serial::Parity::Odd,
            _ => tokio_serial::Parity::None,
        }
    }
}
