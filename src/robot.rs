//! High-level robot actions
//!
//! Thin veneer translating domain units (motor letters, color names,
//! volume levels, rotations) into command payloads, and applying blocking
//! semantics via completion watching. All protocol behavior lives in the
//! engine underneath; nothing here touches the transport directly.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::command::{Command, Opcode};
use crate::completion::CompletionTarget;
use crate::error::{LinkError, Result};
use crate::service::LinkHandle;
use crate::status::DeviceStatus;

/// Indefinite duration: the actuator runs until stopped explicitly.
/// Indefinite actions are never blocking — there is no completion edge to
/// wait for.
pub const FOREVER: f64 = f64::INFINITY;

/// One or more motor ports, as bit flags (A = 0b001, B = 0b010, C = 0b100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorSet(u8);

impl MotorSet {
    pub const A: MotorSet = MotorSet(0b001);
    pub const B: MotorSet = MotorSet(0b010);
    pub const C: MotorSet = MotorSet(0b100);

    pub fn mask(self) -> u8 {
        self.0
    }

    fn is_single(self) -> bool {
        self.0.count_ones() == 1
    }

    /// Seconds of runtime per rotation, calibrated per gang size.
    fn seconds_per_rotation(self) -> f64 {
        if self.is_single() {
            0.63
        } else {
            0.68
        }
    }
}

impl std::ops::BitOr for MotorSet {
    type Output = MotorSet;

    fn bitor(self, rhs: MotorSet) -> MotorSet {
        MotorSet(self.0 | rhs.0)
    }
}

impl FromStr for MotorSet {
    type Err = LinkError;

    /// Parse a port string like "A", "bc" or "ABC".
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(LinkError::invalid_parameter("Motor set cannot be empty"));
        }
        let mut mask = 0u8;
        for c in s.chars() {
            mask |= match c.to_ascii_uppercase() {
                'A' => 0b001,
                'B' => 0b010,
                'C' => 0b100,
                other => {
                    return Err(LinkError::invalid_parameter(format!(
                        "Motor port must be A, B, or C, got '{other}'"
                    )))
                }
            };
        }
        Ok(MotorSet(mask))
    }
}

impl fmt::Display for MotorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [(0b001, 'A'), (0b010, 'B'), (0b100, 'C')] {
            if self.0 & flag != 0 {
                write!(f, "{name}")?;
            }
        }
        Ok(())
    }
}

/// Motor spin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    fn wire_byte(self) -> u8 {
        match self {
            // The firmware takes a signed byte: 1 forward, -1 reverse.
            Direction::Clockwise => 0x01,
            Direction::CounterClockwise => 0xFF,
        }
    }
}

/// RGB color for the LED ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const PURPLE: Color = Color::rgb(128, 0, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Look up a named color (case-insensitive).
    pub fn from_name(name: &str) -> Option<Color> {
        match name.to_ascii_lowercase().as_str() {
            "red" => Some(Color::RED),
            "green" => Some(Color::GREEN),
            "blue" => Some(Color::BLUE),
            "yellow" => Some(Color::YELLOW),
            "cyan" => Some(Color::CYAN),
            "magenta" => Some(Color::MAGENTA),
            "white" => Some(Color::WHITE),
            "purple" => Some(Color::PURPLE),
            _ => None,
        }
    }
}

/// Built-in sound catalog of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Sound {
    Siren = 1,
    Bell = 2,
    Bird = 3,
    Beat = 4,
    Dog = 5,
    Monkey = 6,
    Elephant = 7,
    Applause = 8,
    Violin = 9,
    Guitar = 10,
    RobotLift = 11,
    Truck = 12,
    Smash = 13,
    Clown = 14,
    Cheering = 15,
}

impl Sound {
    pub const ALL: [Sound; 15] = [
        Sound::Siren,
        Sound::Bell,
        Sound::Bird,
        Sound::Beat,
        Sound::Dog,
        Sound::Monkey,
        Sound::Elephant,
        Sound::Applause,
        Sound::Violin,
        Sound::Guitar,
        Sound::RobotLift,
        Sound::Truck,
        Sound::Smash,
        Sound::Clown,
        Sound::Cheering,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Sound::Siren => "siren",
            Sound::Bell => "bell",
            Sound::Bird => "bird",
            Sound::Beat => "beat",
            Sound::Dog => "dog",
            Sound::Monkey => "monkey",
            Sound::Elephant => "elephant",
            Sound::Applause => "applause",
            Sound::Violin => "violin",
            Sound::Guitar => "guitar",
            Sound::RobotLift => "robot lift",
            Sound::Truck => "truck",
            Sound::Smash => "smash",
            Sound::Clown => "clown",
            Sound::Cheering => "cheering",
        }
    }
}

/// Actuator runtime: bounded seconds or indefinite.
struct Runtime {
    kind: u8,
    ticks: u32,
    indefinite: bool,
}

fn runtime_from(duration: f64) -> Result<Runtime> {
    if duration.is_infinite() {
        return Ok(Runtime {
            kind: 1,
            ticks: 0,
            indefinite: true,
        });
    }
    if !(0.0..=10.0).contains(&duration) {
        return Err(LinkError::invalid_parameter(
            "Duration must be between 0 and 10 seconds, or FOREVER",
        ));
    }
    Ok(Runtime {
        kind: 0,
        ticks: (duration * 100.0) as u32,
        indefinite: false,
    })
}

/// Scale a 0..=10 level to the firmware's 0..=255 range.
fn scale_level(level: u8, what: &str) -> Result<u8> {
    if level > 10 {
        return Err(LinkError::invalid_parameter(format!(
            "{what} must be between 0 and 10"
        )));
    }
    Ok((u16::from(level) * 255 / 10) as u8)
}

fn check_led_port(port: u8) -> Result<()> {
    if port == 1 || port == 2 {
        Ok(())
    } else {
        Err(LinkError::invalid_parameter("LED port must be 1 or 2"))
    }
}

fn check_sensor_port(port: u8) -> Result<()> {
    if port == 1 || port == 2 {
        Ok(())
    } else {
        Err(LinkError::invalid_parameter("Sensor port must be 1 or 2"))
    }
}

/// Typed action façade over a [`LinkHandle`].
#[derive(Clone)]
pub struct Robot {
    link: LinkHandle,
}

impl Robot {
    pub fn new(link: LinkHandle) -> Self {
        Self { link }
    }

    /// Run one or more motors. `power` is 0..=10, `duration` in seconds or
    /// [`FOREVER`]. A blocking call returns once the motors' activity
    /// flags have gone active and back to inactive.
    pub async fn drive(
        &self,
        motors: MotorSet,
        duration: f64,
        power: u8,
        direction: Direction,
        blocking: bool,
    ) -> Result<()> {
        let runtime = runtime_from(duration)?;
        let power = scale_level(power, "Power")?;

        let payload = vec![
            motors.mask(),
            runtime.kind,
            (runtime.ticks >> 24) as u8,
            (runtime.ticks >> 16) as u8,
            (runtime.ticks >> 8) as u8,
            runtime.ticks as u8,
            power,
            direction.wire_byte(),
        ];
        self.link.submit(Command::new(Opcode::Move, payload)).await?;

        if blocking && !runtime.indefinite {
            debug!("waiting for motors {motors} to finish");
            self.link
                .watch_completion(CompletionTarget::Motors(motors.mask()))
                .await?;
        }
        Ok(())
    }

    /// Run motors for a number of rotations, converted to runtime via the
    /// per-gang calibration factor. Always blocking.
    pub async fn rotations(
        &self,
        motors: MotorSet,
        turns: f64,
        power: u8,
        direction: Direction,
    ) -> Result<()> {
        if !(0.1..=100.0).contains(&turns) {
            return Err(LinkError::invalid_parameter(
                "Rotations must be between 0.1 and 100",
            ));
        }
        let duration = turns * motors.seconds_per_rotation();
        self.drive(motors, duration, power, direction, true).await
    }

    /// Stop the given motors immediately.
    pub async fn stop_motors(&self, motors: MotorSet) -> Result<()> {
        self.link
            .submit(Command::new(Opcode::MoveStop, vec![motors.mask()]))
            .await?;
        Ok(())
    }

    /// Light an LED port. `brightness` is 0..=10.
    pub async fn light(
        &self,
        port: u8,
        duration: f64,
        brightness: u8,
        color: Color,
        blocking: bool,
    ) -> Result<()> {
        check_led_port(port)?;
        let runtime = runtime_from(duration)?;
        let brightness = scale_level(brightness, "Brightness")?;

        let payload = vec![
            port,
            runtime.kind,
            (runtime.ticks >> 24) as u8,
            (runtime.ticks >> 16) as u8,
            (runtime.ticks >> 8) as u8,
            runtime.ticks as u8,
            brightness,
            color.r,
            color.g,
            color.b,
        ];
        self.link
            .submit(Command::new(Opcode::Light, payload))
            .await?;

        if blocking && !runtime.indefinite {
            self.link
                .watch_completion(CompletionTarget::Led(port))
                .await?;
        }
        Ok(())
    }

    /// Turn an LED port off.
    pub async fn stop_light(&self, port: u8) -> Result<()> {
        check_led_port(port)?;
        self.link
            .submit(Command::new(Opcode::LightStop, vec![port]))
            .await?;
        Ok(())
    }

    /// Play a catalog sound. `volume` is 0..=10.
    pub async fn play_sound(&self, sound: Sound, volume: u8, blocking: bool) -> Result<()> {
        let volume = scale_level(volume, "Volume")?;
        self.link
            .submit(Command::new(Opcode::PlaySound, vec![sound.id(), volume]))
            .await?;

        if blocking {
            self.link.watch_completion(CompletionTarget::Sound).await?;
        }
        Ok(())
    }

    /// Stop sound playback.
    pub async fn stop_sound(&self) -> Result<()> {
        self.link
            .submit(Command::new(Opcode::SoundStop, Vec::new()))
            .await?;
        Ok(())
    }

    /// Arm a sensor trigger window and block until the sensor reports a
    /// value inside `[min, max]`.
    pub async fn wait_sensor(&self, port: u8, min: u8, max: u8) -> Result<()> {
        check_sensor_port(port)?;
        self.link
            .submit(Command::new(Opcode::WaitSensor, vec![port, min, max]))
            .await?;
        self.link
            .watch_completion(CompletionTarget::Sensor(port))
            .await
    }

    /// Request a sensor reading from the controller.
    pub async fn read_sensor(&self, port: u8) -> Result<u8> {
        check_sensor_port(port)?;
        let response = self
            .link
            .submit(Command::new(Opcode::GetSensor, vec![port]))
            .await?;
        response
            .payload()
            .first()
            .copied()
            .ok_or_else(|| LinkError::protocol("Empty sensor reply payload"))
    }

    /// Last polled status snapshot.
    pub fn status(&self) -> DeviceStatus {
        self.link.current_status()
    }

    /// Pause the script, clamped to 0.01..=10 seconds.
    pub async fn wait(&self, seconds: f64) {
        let seconds = seconds.clamp(0.01, 10.0);
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::frame;
    use crate::service::RobotLink;
    use crate::transport::mock::MockTransport;

    fn test_link(mock: &MockTransport) -> RobotLink {
        let config = LinkConfig {
            reply_timeout: Duration::from_millis(30),
            settle_delay: Duration::from_millis(1),
            // Keep the poller quiet so scripted replies go to the actions.
            poll_interval: Duration::from_secs(60),
            ..LinkConfig::default()
        };
        RobotLink::with_transport(mock.clone(), config)
    }

    fn decoded_payload(written: &[u8]) -> Vec<u8> {
        match frame::decode(written) {
            frame::Decode::Complete { frame, .. } => frame.payload,
            other => panic!("written bytes should be one frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn drive_builds_move_payload() {
        let mock = MockTransport::new();
        mock.queue_read(frame::encode(0x80, &[]).unwrap()).await;
        let link = test_link(&mock);
        let robot = Robot::new(link.handle());

        robot
            .drive(
                MotorSet::A | MotorSet::B,
                2.5,
                10,
                Direction::CounterClockwise,
                false,
            )
            .await
            .expect("drive should resolve");

        let written = mock.written().await;
        assert_eq!(written.len(), 1);
        // 2.5 s -> 250 ticks, power 10 -> 255, direction -1 -> 0xFF
        assert_eq!(
            decoded_payload(&written[0]),
            vec![0b011, 0, 0, 0, 0, 250, 255, 0xFF]
        );
        link.shutdown().await;
    }

    #[tokio::test]
    async fn forever_drive_is_indefinite_and_nonblocking() {
        let mock = MockTransport::new();
        mock.queue_read(frame::encode(0x80, &[]).unwrap()).await;
        let link = test_link(&mock);
        let robot = Robot::new(link.handle());

        // No status snapshots are ever published here, so this would hang
        // if the indefinite path tried to watch completion.
        robot
            .drive(MotorSet::C, FOREVER, 5, Direction::Clockwise, true)
            .await
            .expect("indefinite drive must not block");

        let payload = decoded_payload(&mock.written().await[0]);
        assert_eq!(payload[1], 1); // indefinite marker
        assert_eq!(&payload[2..6], &[0, 0, 0, 0]);
        link.shutdown().await;
    }

    #[tokio::test]
    async fn light_builds_payload_with_color() {
        let mock = MockTransport::new();
        mock.queue_read(frame::encode(0x81, &[]).unwrap()).await;
        let link = test_link(&mock);
        let robot = Robot::new(link.handle());

        robot
            .light(2, 1.0, 5, Color::PURPLE, false)
            .await
            .expect("light should resolve");

        assert_eq!(
            decoded_payload(&mock.written().await[0]),
            vec![2, 0, 0, 0, 0, 100, 127, 128, 0, 128]
        );
        link.shutdown().await;
    }

    #[tokio::test]
    async fn play_sound_scales_volume() {
        let mock = MockTransport::new();
        mock.queue_read(frame::encode(0x82, &[]).unwrap()).await;
        let link = test_link(&mock);
        let robot = Robot::new(link.handle());

        robot
            .play_sound(Sound::Bird, 10, false)
            .await
            .expect("play_sound should resolve");

        assert_eq!(decoded_payload(&mock.written().await[0]), vec![3, 255]);
        link.shutdown().await;
    }

    #[tokio::test]
    async fn parameter_validation_rejects_before_io() {
        let mock = MockTransport::new();
        let link = test_link(&mock);
        let robot = Robot::new(link.handle());

        assert!(robot
            .drive(MotorSet::A, 11.0, 5, Direction::Clockwise, false)
            .await
            .is_err());
        assert!(robot
            .drive(MotorSet::A, 1.0, 11, Direction::Clockwise, false)
            .await
            .is_err());
        assert!(robot.light(3, 1.0, 5, Color::RED, false).await.is_err());
        assert!(robot.play_sound(Sound::Dog, 11, false).await.is_err());
        assert!(robot.read_sensor(0).await.is_err());
        assert!(robot
            .rotations(MotorSet::A, 0.0, 5, Direction::Clockwise)
            .await
            .is_err());

        assert!(mock.written().await.is_empty());
        link.shutdown().await;
    }

    #[tokio::test]
    async fn read_sensor_returns_first_payload_byte() {
        let mock = MockTransport::new();
        mock.queue_read(frame::encode(0x88, &[0xC8]).unwrap()).await;
        let link = test_link(&mock);
        let robot = Robot::new(link.handle());

        let value = robot.read_sensor(2).await.expect("reading should resolve");
        assert_eq!(value, 0xC8);
        assert_eq!(decoded_payload(&mock.written().await[0]), vec![2]);
        link.shutdown().await;
    }

    #[test]
    fn motor_set_parsing() {
        assert_eq!("A".parse::<MotorSet>().unwrap(), MotorSet::A);
        assert_eq!("bc".parse::<MotorSet>().unwrap(), MotorSet::B | MotorSet::C);
        assert_eq!("ABC".parse::<MotorSet>().unwrap().mask(), 0b111);
        assert!("D".parse::<MotorSet>().is_err());
        assert!("".parse::<MotorSet>().is_err());
    }

    #[test]
    fn color_names() {
        assert_eq!(Color::from_name("Red"), Some(Color::RED));
        assert_eq!(Color::from_name("purple"), Some(Color::PURPLE));
        assert_eq!(Color::from_name("mauve"), None);
    }

    #[test]
    fn rotation_calibration() {
        assert!((MotorSet::A.seconds_per_rotation() - 0.63).abs() < f64::EPSILON);
        assert!(((MotorSet::A | MotorSet::B).seconds_per_rotation() - 0.68).abs() < f64::EPSILON);
    }
}
