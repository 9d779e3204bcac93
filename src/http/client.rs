use super::body::{DeferredBody, deferred};
use super::resolver::TimedResolver;
use super::ClientConfig;
use crate::common::EchoClient;
use crate::{EchoError, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Response, StatusCode, Uri};
use http_body_util::{BodyExt, Either, Full};
use hyper::body::Incoming;
use hyper_util::client::legacy::{self, Client};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::task::AbortOnDropHandle;
use tracing::debug;

/// How a request body is handed to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The complete body is supplied upfront and sent with a Content-Length
    Buffered,
    /// The request is issued first and the body is written afterwards
    /// through a stream-like handle, which makes it chunked on the wire
    Deferred,
}

impl fmt::Display for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Submission::Buffered => write!(f, "non-deferred"),
            Submission::Deferred => write!(f, "deferred"),
        }
    }
}

pub(crate) type RequestBody = Either<Full<Bytes>, DeferredBody>;

/// Status and body of a completed exchange
#[derive(Debug, Clone)]
pub struct EchoResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Pooled HTTP client that posts payloads to an echo server
///
/// Connections are kept in a pool and reused between requests. At most
/// `max_connections_per_destination` exchanges are in flight at once.
///
/// # Examples
///
/// ```no_run
/// use echoprobe::http::{ClientConfig, HttpEchoClient, Submission};
/// use echoprobe::EchoClient;
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HttpEchoClient::new("http://localhost:8080/", ClientConfig::default())?;
///
///     let echoed = client.echo(Bytes::from_static(b"hello"), Submission::Deferred).await?;
///     assert_eq!(&echoed[..], b"hello");
///     Ok(())
/// }
/// ```
pub struct HttpEchoClient {
    inner: Client<HttpConnector<TimedResolver>, RequestBody>,
    uri: Uri,
    config: ClientConfig,
    permits: Arc<Semaphore>,
}

impl HttpEchoClient {
    /// Creates a client that posts to `uri`
    ///
    /// No connection is opened until the first request.
    pub fn new(uri: &str, config: ClientConfig) -> Result<Self> {
        let uri = Uri::from_str(uri)?;
        if uri.scheme_str() != Some("http") {
            return Err(EchoError::Config(format!(
                "Only http:// targets are supported, got {uri}"
            )));
        }
        if config.max_connections_per_destination == 0 {
            return Err(EchoError::Config(
                "max_connections_per_destination must be at least 1".to_string(),
            ));
        }

        let mut connector =
            HttpConnector::new_with_resolver(TimedResolver::new(config.address_resolution_timeout));
        connector.set_nodelay(config.tcp_nodelay);
        connector.set_connect_timeout(Some(config.connect_timeout));

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.idle_timeout)
            .pool_max_idle_per_host(config.max_connections_per_destination)
            .pool_timer(TokioTimer::new())
            .build(connector);

        Ok(Self {
            inner,
            uri,
            permits: Arc::new(Semaphore::new(config.max_connections_per_destination)),
            config,
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Posts `body` and reads the complete response
    ///
    /// The whole exchange is bounded by the request timeout and each gap
    /// between response body frames by the request idle timeout.
    pub async fn post(&self, body: Bytes, submission: Submission) -> Result<EchoResponse> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EchoError::Closed("Client connection permits closed".to_string()))?;

        timeout(self.config.request_timeout, self.exchange(body, submission))
            .await
            .map_err(|_| {
                EchoError::Timeout(format!(
                    "No complete response within {:?}",
                    self.config.request_timeout
                ))
            })?
    }

    async fn exchange(&self, body: Bytes, submission: Submission) -> Result<EchoResponse> {
        let response = match submission {
            Submission::Buffered => {
                let request = self.request(Either::Left(Full::new(body)))?;
                self.inner.request(request).await?
            }
            Submission::Deferred => {
                let (mut writer, content) = deferred(self.config.deferred_capacity);
                let request = self.request(Either::Right(content))?;
                let pending = self.send_in_background(request);

                let written = writer.write(body).await;
                writer.close();

                // A send failure explains a closed writer better than the writer does
                let response = pending.await??;
                written?;
                response
            }
        };

        let status = response.status();
        debug!(%status, %submission, "Received response head");

        let body = self.read_body(response.into_body()).await?;
        Ok(EchoResponse { status, body })
    }

    /// Starts sending `request` on its own task; dropping the handle
    /// cancels the send
    pub(crate) fn send_in_background(
        &self,
        request: Request<RequestBody>,
    ) -> AbortOnDropHandle<std::result::Result<Response<Incoming>, legacy::Error>> {
        AbortOnDropHandle::new(tokio::spawn(self.inner.request(request)))
    }

    pub(crate) fn request(&self, body: RequestBody) -> Result<Request<RequestBody>> {
        Ok(Request::builder()
            .method(Method::POST)
            .uri(self.uri.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
            .body(body)?)
    }

    async fn read_body(&self, mut body: Incoming) -> Result<Bytes> {
        let mut buffer = BytesMut::new();

        loop {
            let frame = timeout(self.config.request_idle_timeout, body.frame())
                .await
                .map_err(|_| {
                    EchoError::Timeout(format!(
                        "Response body idle for {:?}",
                        self.config.request_idle_timeout
                    ))
                })?;

            let Some(frame) = frame else {
                break;
            };

            if let Ok(data) = frame?.into_data() {
                if buffer.len() + data.len() > self.config.max_response_size {
                    return Err(EchoError::ResponseTooLarge {
                        limit: self.config.max_response_size,
                        received: buffer.len() + data.len(),
                    });
                }
                buffer.extend_from_slice(&data);
            }
        }

        Ok(buffer.freeze())
    }
}

#[async_trait]
impl EchoClient for HttpEchoClient {
    /// Frames `payload`, posts it, requires a 200 and unframes the reply
    async fn echo(&self, payload: Bytes, submission: Submission) -> Result<Bytes> {
        let framing = self.config.framing;
        let response = self.post(framing.encode(payload)?, submission).await?;

        if response.status != StatusCode::OK {
            return Err(EchoError::Status(response.status));
        }

        framing.decode(response.body)
    }
}
