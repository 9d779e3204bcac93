use crate::common::EchoServerTrait;
use crate::framing::Framing;
use crate::http::{HttpConfig, HttpEchoServer};
use crate::Result;
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A running echo server bound to an ephemeral loopback port
pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: JoinHandle<Result<()>>,
    shutdown: broadcast::Sender<()>,
}

impl TestServer {
    /// Signals the server to stop and waits for it to finish draining
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.handle.await?
    }
}

/// Starts an HTTP echo server on `127.0.0.1:0` for tests
///
/// The listener is bound before this returns, so the reported address
/// is accepting connections immediately.
pub async fn spawn_test_server(framing: Framing) -> Result<TestServer> {
    spawn_test_server_with_config(HttpConfig {
        bind_addr: "127.0.0.1:0".parse().map_err(|e| {
            crate::EchoError::Config(format!("Invalid test address: {e}"))
        })?,
        framing,
        ..HttpConfig::default()
    })
    .await
}

/// Starts an HTTP echo server with a caller-supplied configuration
pub async fn spawn_test_server_with_config(config: HttpConfig) -> Result<TestServer> {
    let server = HttpEchoServer::new(config);
    let listener = server.bind().await?;
    let addr = listener.local_addr()?;
    let shutdown = server.shutdown_signal();

    let handle = tokio::spawn(async move { server.serve(listener).await });

    Ok(TestServer {
        addr,
        handle,
        shutdown,
    })
}
