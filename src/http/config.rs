use crate::framing::Framing;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the HTTP echo server
///
/// # Examples
///
/// ```rust
/// use echoprobe::http::HttpConfig;
/// use echoprobe::Framing;
/// use std::time::Duration;
///
/// let config = HttpConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
///     framing: Framing::LengthPrefixed,
///     read_timeout: Duration::from_secs(30),
///     ..HttpConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Network address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Maximum accepted request body size in bytes
    pub max_body_size: usize,
    /// Time allowed to receive a complete request head
    pub header_read_timeout: Duration,
    /// Time allowed to receive a complete request body
    pub read_timeout: Duration,
    /// Time allowed for open connections to finish after shutdown
    pub shutdown_timeout: Duration,
    /// Whether to set TCP_NODELAY on accepted sockets
    pub tcp_nodelay: bool,
    /// Server name to include in responses (optional)
    pub server_name: Option<String>,
    /// Content type for echoed responses
    pub content_type: String,
    /// Body framing the server expects and echoes
    pub framing: Framing,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 100,
            max_body_size: 8 * 1024 * 1024,
            header_read_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
            tcp_nodelay: true,
            server_name: Some("EchoProbe/0.1".to_string()),
            content_type: "application/octet-stream".to_string(),
            framing: Framing::Raw,
        }
    }
}

/// Configuration for the pooled HTTP echo client
///
/// Defaults reproduce the client settings the harness was written
/// against: a 10-connection pool, 5 second resolve, connect and idle
/// timeouts, and 60 second request timeouts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on connections open to the destination at once
    pub max_connections_per_destination: usize,
    /// Whether to set TCP_NODELAY on client sockets
    pub tcp_nodelay: bool,
    /// Time allowed for host name resolution
    pub address_resolution_timeout: Duration,
    /// Time allowed to establish a TCP connection
    pub connect_timeout: Duration,
    /// How long an unused pooled connection is kept
    pub idle_timeout: Duration,
    /// Time allowed for a whole request/response exchange
    pub request_timeout: Duration,
    /// Time allowed between two frames of a response body
    pub request_idle_timeout: Duration,
    /// Maximum response size to prevent memory exhaustion
    pub max_response_size: usize,
    /// Chunks buffered between a deferred writer and the connection
    pub deferred_capacity: usize,
    /// Body framing used for requests and expected in responses
    pub framing: Framing,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_connections_per_destination: 10,
            tcp_nodelay: true,
            address_resolution_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            request_idle_timeout: Duration::from_secs(60),
            max_response_size: 10 * 1024 * 1024, // 10MB
            deferred_capacity: 16,
            framing: Framing::Raw,
        }
    }
}
