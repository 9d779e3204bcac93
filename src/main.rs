use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use echoprobe::harness::{self, HarnessConfig};
use echoprobe::Framing;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Posts a fixed payload to an embedded echo server, first as a buffered
/// body and then through a deferred writer, and checks every echo
#[derive(Debug, Parser)]
#[command(name = "echoprobe", version, about)]
struct Args {
    /// Body framing: raw or length-prefixed
    #[arg(default_value = "raw")]
    framing: Framing,

    /// Local port for the embedded server (0 picks a free port)
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Round trips per submission strategy
    #[arg(short, long, default_value_t = 99)]
    iterations: usize,

    /// Payload length in bytes
    #[arg(long, default_value_t = echoprobe::payload::DEFAULT_PAYLOAD_LEN)]
    payload_size: usize,

    /// Value every payload byte is set to
    #[arg(long, default_value_t = echoprobe::payload::DEFAULT_FILL)]
    fill: u8,
}

impl Args {
    fn into_config(self) -> HarnessConfig {
        let mut config = HarnessConfig {
            iterations: self.iterations,
            payload_len: self.payload_size,
            fill: self.fill,
            ..HarnessConfig::default()
        }
        .with_framing(self.framing);
        config.server.bind_addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("echoprobe=info")),
        )
        .init();

    let config = Args::parse().into_config();
    info!(
        address = %config.server.bind_addr,
        framing = %config.client.framing,
        round_trips = config.total_round_trips(),
        payload_size = config.payload_len,
        "Starting echo round-trip run"
    );

    tokio::select! {
        report = harness::run(config) => {
            let report = report.wrap_err("Echo round-trip run failed")?;
            info!(round_trips = report.round_trips, elapsed = ?report.elapsed, "All payloads echoed intact");
            Ok(())
        }
        _ = signal::ctrl_c() => {
            warn!("Received shutdown signal, abandoning run");
            Err(eyre!("Run interrupted"))
        }
    }
}
