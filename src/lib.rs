use thiserror::Error;

/// Error types for the echoprobe library
#[derive(Error, Debug)]
pub enum EchoError {
    /// Socket-level errors (bind, accept, resolve)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] ::http::Error),

    /// HTTP/1.1 protocol errors raised while reading a message
    #[error("HTTP protocol error: {0}")]
    Hyper(#[from] hyper::Error),

    /// Errors raised by the pooled client (connect, send)
    #[error("HTTP client error: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    /// The target URI could not be parsed
    #[error("Invalid URI: {0}")]
    Uri(#[from] ::http::uri::InvalidUri),

    /// The server answered with something other than 200 OK
    #[error("Status={0}")]
    Status(::http::StatusCode),

    /// The echoed body differs from the body that was sent
    #[error(
        "Payload bytes not identical: sent {expected} bytes, received {actual} bytes{}",
        offset_suffix(.first_difference)
    )]
    PayloadMismatch {
        expected: usize,
        actual: usize,
        first_difference: Option<usize>,
    },

    /// The response body grew past the configured limit
    #[error("Response exceeds maximum size of {limit} bytes: received at least {received} bytes")]
    ResponseTooLarge { limit: usize, received: usize },

    /// Length-prefixed framing errors
    #[error("Framing error: {0}")]
    Framing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// A channel or semaphore was closed underneath an operation
    #[error("Closed: {0}")]
    Closed(String),

    /// A spawned task panicked or was cancelled
    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn offset_suffix(first_difference: &Option<usize>) -> String {
    first_difference
        .map(|offset| format!(", first difference at offset {offset}"))
        .unwrap_or_default()
}

/// Result type for the echoprobe library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod common;
pub mod framing;
pub mod harness;
pub mod http;
pub mod payload;

// Re-export main types for convenience
pub use common::{EchoClient, EchoServerTrait};
pub use framing::Framing;
pub use harness::{HarnessConfig, RunReport};
pub use crate::http::{ClientConfig, HttpConfig, HttpEchoClient, HttpEchoServer, Submission};
pub use payload::Payload;
