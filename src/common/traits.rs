use crate::Result;
use crate::http::Submission;
use async_trait::async_trait;
use bytes::Bytes;

/// Common trait for echo servers
///
/// Implementors run until their shutdown signal fires, then stop
/// accepting and drain the connections they already hold.
#[async_trait]
pub trait EchoServerTrait {
    /// Starts the echo server and listens for connections
    async fn run(&self) -> Result<()>;

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()>;
}

/// Common trait for echo clients
///
/// The harness drives its round trips through this trait, which keeps
/// verification independent of the transport that produced the bytes.
#[async_trait]
pub trait EchoClient {
    /// Sends `payload` using the given submission strategy and returns
    /// the payload the server echoed back
    async fn echo(&self, payload: Bytes, submission: Submission) -> Result<Bytes>;
}
