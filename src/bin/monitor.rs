//! Monitor: print every status snapshot the poller publishes.

use anyhow::anyhow;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use botlink::{LinkConfig, RobotLink};

#[derive(Parser, Debug)]
#[command(name = "monitor", about = "Live status monitor for the robot controller")]
struct Args {
    /// Serial port path; discovered automatically when omitted
    #[arg(short, long)]
    port: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = match args.port {
        Some(port) => port,
        None => botlink::find_usb_port().ok_or_else(|| anyhow!("No USB serial port found"))?,
    };

    let link = RobotLink::connect(LinkConfig::for_port(port))?;
    let mut status_rx = link.handle().subscribe_status();

    info!("Monitoring; press Ctrl-C to stop");
    loop {
        tokio::select! {
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                println!("{status}");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    link.shutdown().await;
    Ok(())
}
