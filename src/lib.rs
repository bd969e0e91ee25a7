//! # botlink
//!
//! Async command/response protocol engine for small robot controllers
//! speaking a framed binary protocol over a serial link.
//!
//! The controller understands fixed-layout frames (sync byte, opcode,
//! length, payload, additive checksum) and acknowledges every request with
//! a reply frame from a fixed opcode table. The link is unreliable:
//! replies can be lost, bytes can be corrupted mid-stream, and a
//! continuously polled status report shares the wire with application
//! commands. This crate owns all of that:
//!
//! - **Framing** ([`frame`], [`scanner`]): checksum-validated
//!   encode/decode with one-byte resynchronization past corruption.
//! - **Dispatch** ([`dispatch`]): one send-wait-retry cycle per command
//!   under exclusive transport ownership, with reply correlation by
//!   opcode.
//! - **Ownership** ([`service`]): a single owner task serializes
//!   application commands and the 50 ms status poll over the transport;
//!   callers hold a cloneable [`LinkHandle`].
//! - **Status** ([`status`], [`completion`]): whole-snapshot publication
//!   through a watch channel, and edge-triggered completion detection for
//!   blocking actuator calls.
//! - **Actions** ([`robot`]): typed motor/light/sound/sensor commands with
//!   domain unit translation.
//!
//! ## Quick start
//!
//! ```no_run
//! use botlink::{LinkConfig, Robot, RobotLink, Direction, MotorSet, Sound};
//!
//! #[tokio::main]
//! async fn main() -> botlink::Result<()> {
//!     let port = botlink::find_usb_port().unwrap_or_else(|| "/dev/ttyUSB0".into());
//!     let link = RobotLink::connect(LinkConfig::for_port(port))?;
//!     let robot = Robot::new(link.handle());
//!
//!     robot.play_sound(Sound::Bell, 7, true).await?;
//!     robot
//!         .drive(MotorSet::A | MotorSet::B, 2.0, 8, Direction::Clockwise, true)
//!         .await?;
//!
//!     link.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod completion;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod robot;
pub mod scanner;
pub mod service;
pub mod status;
pub mod transport;

pub use command::{Command, Opcode, Response};
pub use completion::{CompletionTarget, CompletionWatcher};
pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use robot::{Color, Direction, MotorSet, Robot, Sound, FOREVER};
pub use service::{LinkHandle, PendingReply, RobotLink};
pub use status::DeviceStatus;
pub use transport::{find_usb_port, SerialTransport, Transport};
