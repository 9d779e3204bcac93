use hyper_util::client::legacy::connect::dns::Name;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tower_service::Service;
use tracing::debug;

/// DNS resolver that gives up after a fixed time
///
/// Port numbers in the returned addresses are zero; the connector fills
/// in the port from the request URI.
#[derive(Debug, Clone)]
pub struct TimedResolver {
    timeout: Duration,
}

impl TimedResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Service<Name> for TimedResolver {
    type Response = std::vec::IntoIter<SocketAddr>;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = io::Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, name: Name) -> Self::Future {
        let timeout = self.timeout;
        Box::pin(async move {
            let host = name.as_str();
            let addrs = tokio::time::timeout(timeout, tokio::net::lookup_host((host, 0)))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("resolving {host} took longer than {timeout:?}"),
                    )
                })??
                .collect::<Vec<_>>();

            debug!(%host, count = addrs.len(), "Resolved host");
            Ok(addrs.into_iter())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_resolves_localhost() {
        let mut resolver = TimedResolver::new(Duration::from_secs(5));
        let name = Name::from_str("localhost").unwrap();

        let addrs: Vec<_> = resolver.call(name).await.unwrap().collect();
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(|addr| addr.ip().is_loopback()));
    }
}
