//! Demo: drive a short action sequence against a connected controller.

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use botlink::{Color, Direction, LinkConfig, MotorSet, Robot, RobotLink, Sound};

#[derive(Parser, Debug)]
#[command(name = "demo", about = "Run a demo sequence on the robot controller")]
struct Args {
    /// Serial port path; discovered automatically when omitted
    #[arg(short, long)]
    port: Option<String>,

    /// YAML configuration file overriding the defaults
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => LinkConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LinkConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    } else if args.config.is_none() {
        config.port = botlink::find_usb_port()
            .ok_or_else(|| anyhow!("No USB serial port found; pass --port"))?;
    }

    info!("Connecting to controller on {}", config.port);
    let link = RobotLink::connect(config).context("opening link")?;
    let robot = Robot::new(link.handle());

    info!("Available sounds:");
    for sound in Sound::ALL {
        info!("  {:2}: {}", sound.id(), sound.name());
    }

    robot.play_sound(Sound::Bell, 7, true).await?;
    robot
        .drive(MotorSet::A, 1.5, 8, Direction::Clockwise, true)
        .await?;
    robot.light(1, 1.0, 10, Color::GREEN, true).await?;
    robot
        .rotations(MotorSet::A | MotorSet::B, 2.0, 6, Direction::CounterClockwise)
        .await?;

    let reading = robot.read_sensor(1).await?;
    info!("Sensor 1 reads {reading}");
    info!("Final status: {}", robot.status());

    link.shutdown().await;
    Ok(())
}
