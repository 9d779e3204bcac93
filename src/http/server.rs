use super::{EchoHandler, HttpConfig};
use crate::common::EchoServerTrait;
use crate::Result;
use async_trait::async_trait;
use http::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{error, info, warn, Instrument};

/// Embedded HTTP/1.1 echo server
///
/// Every accepted connection is served on its own task with keep-alive
/// enabled, so a pooled client can reuse connections across requests.
///
/// # Examples
///
/// ```no_run
/// use echoprobe::http::{HttpConfig, HttpEchoServer};
/// use echoprobe::common::EchoServerTrait;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = HttpEchoServer::new(HttpConfig::default());
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct HttpEchoServer {
    config: HttpConfig,
    shutdown_signal: Arc<broadcast::Sender<()>>,
    // Held from construction so a signal sent before `serve` starts is kept
    initial_shutdown_rx: Mutex<Option<broadcast::Receiver<()>>>,
}

impl HttpEchoServer {
    /// Creates a new HTTP echo server with the given configuration
    pub fn new(config: HttpConfig) -> Self {
        let (shutdown_signal, shutdown_rx) = broadcast::channel(1);
        Self {
            config,
            shutdown_signal: Arc::new(shutdown_signal),
            initial_shutdown_rx: Mutex::new(Some(shutdown_rx)),
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Binds the configured address without accepting yet
    pub async fn bind(&self) -> Result<TcpListener> {
        Ok(TcpListener::bind(self.config.bind_addr).await?)
    }

    /// Accepts and serves connections from `listener` until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let handler = Arc::new(EchoHandler::from_config(&self.config)?);

        let mut http = http1::Builder::new();
        http.timer(TokioTimer::new())
            .header_read_timeout(self.config.header_read_timeout)
            .keep_alive(true);

        let graceful = GracefulShutdown::new();
        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = self
            .initial_shutdown_rx
            .lock()
            .ok()
            .and_then(|mut rx| rx.take())
            .unwrap_or_else(|| self.shutdown_signal.subscribe());

        info!(address = %listener.local_addr()?, framing = %self.config.framing, "HTTP echo server listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let current_count = connection_count.load(Ordering::SeqCst);
                            if current_count >= self.config.max_connections {
                                warn!(%addr, current = current_count, limit = self.config.max_connections, "Connection rejected: limit reached");
                                continue;
                            }

                            if let Err(e) = stream.set_nodelay(self.config.tcp_nodelay) {
                                warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
                            }

                            let new_count = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
                            info!(%addr, current = new_count, "Accepted connection");

                            let handler = handler.clone();
                            let service = service_fn(move |request: Request<Incoming>| {
                                let handler = handler.clone();
                                async move { Ok::<_, Infallible>(handler.handle(request).await) }
                            });
                            let connection = graceful.watch(http.serve_connection(TokioIo::new(stream), service));

                            let connection_count = connection_count.clone();
                            let span = tracing::info_span!("connection", %addr);

                            tokio::spawn(async move {
                                if let Err(e) = connection.await {
                                    warn!(%addr, error = %e, "Error serving connection");
                                }
                                let final_count = connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                                info!(%addr, current = final_count, "Connection closed");
                            }.instrument(span));
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        drop(listener);

        if timeout(self.config.shutdown_timeout, graceful.shutdown()).await.is_err() {
            warn!(
                remaining = connection_count.load(Ordering::SeqCst),
                "Timed out waiting for connections to close"
            );
        }

        info!("HTTP echo server stopped");
        Ok(())
    }
}

#[async_trait]
impl EchoServerTrait for HttpEchoServer {
    /// Binds the configured address and serves until shutdown
    async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}
