//! The reproduction run
//!
//! Starts an embedded echo server, points a pooled client at it and
//! performs a fixed number of sequential round trips per submission
//! strategy, checking every echoed payload. The first failure ends the
//! run; the server is stopped either way.

use crate::common::{EchoClient, EchoServerTrait};
use crate::framing::Framing;
use crate::http::{ClientConfig, HttpConfig, HttpEchoClient, HttpEchoServer, Submission};
use crate::payload::{DEFAULT_FILL, DEFAULT_PAYLOAD_LEN, Payload};
use crate::Result;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Configuration for a reproduction run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Embedded server settings
    pub server: HttpConfig,
    /// Client settings
    pub client: ClientConfig,
    /// Host name the client addresses the server by
    pub target_host: String,
    /// Round trips per submission strategy
    pub iterations: usize,
    /// Payload length in bytes
    pub payload_len: usize,
    /// Value of every payload byte
    pub fill: u8,
    /// Submission strategies, run in this order
    pub submissions: Vec<Submission>,
}

impl HarnessConfig {
    /// Sets the framing on both the server and the client
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.server.framing = framing;
        self.client.framing = framing;
        self
    }

    pub fn total_round_trips(&self) -> usize {
        self.iterations * self.submissions.len()
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            server: HttpConfig::default(),
            client: ClientConfig::default(),
            target_host: "localhost".to_string(),
            iterations: 99,
            payload_len: DEFAULT_PAYLOAD_LEN,
            fill: DEFAULT_FILL,
            submissions: vec![Submission::Buffered, Submission::Deferred],
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub round_trips: usize,
    pub elapsed: Duration,
}

/// Runs the whole reproduction: server up, client up, round trips, both down
pub async fn run(config: HarnessConfig) -> Result<RunReport> {
    if config.server.framing != config.client.framing {
        return Err(crate::EchoError::Config(format!(
            "Server framing '{}' does not match client framing '{}'",
            config.server.framing, config.client.framing
        )));
    }

    let server = HttpEchoServer::new(config.server.clone());
    let listener = server.bind().await?;
    let addr = listener.local_addr()?;
    let shutdown = server.shutdown_signal();
    let server_handle = tokio::spawn(async move { server.serve(listener).await });

    let uri = format!("http://{}:{}/", config.target_host, addr.port());
    info!(%uri, framing = %config.client.framing, "Starting client");

    let outcome = async {
        let client = HttpEchoClient::new(&uri, config.client.clone())?;
        let payload = Payload::filled(config.payload_len, config.fill);
        verify_round_trips(&client, &payload, &config.submissions, config.iterations).await
    }
    .await;

    // The client's pool goes away with it; only the server needs an explicit stop
    if shutdown.send(()).is_err() {
        error!("Echo server was no longer listening for shutdown");
    }
    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Echo server stopped with an error"),
        Err(e) => error!(error = %e, "Echo server task failed"),
    }

    outcome
}

/// Sends `payload` `iterations` times per submission strategy and checks
/// every echo, stopping at the first failure
pub async fn verify_round_trips<C>(
    client: &C,
    payload: &Payload,
    submissions: &[Submission],
    iterations: usize,
) -> Result<RunReport>
where
    C: EchoClient + Sync,
{
    let started = Instant::now();
    let mut round_trips = 0;

    for &submission in submissions {
        for iteration in 1..=iterations {
            info!(%submission, iteration, "Sending request");

            let echoed = client.echo(payload.bytes(), submission).await?;
            payload.verify(&echoed)?;

            round_trips += 1;
            info!(%submission, iteration, size = echoed.len(), "Finished");
        }
    }

    Ok(RunReport {
        round_trips,
        elapsed: started.elapsed(),
    })
}
