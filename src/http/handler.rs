use super::HttpConfig;
use crate::framing::Framing;
use crate::{EchoError, Result};
use bytes::Bytes;
use http::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, HeaderName, SERVER, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Request handler that echoes POST bodies back unchanged
///
/// Only accepts POST requests. The body is read completely, unwrapped
/// according to the configured framing, wrapped again and written back
/// with status 200.
#[derive(Debug, Clone)]
pub struct EchoHandler {
    framing: Framing,
    read_timeout: Duration,
    max_body_size: usize,
    server_name: Option<HeaderValue>,
    content_type: HeaderValue,
}

impl EchoHandler {
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let server_name = config
            .server_name
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|e| EchoError::Config(format!("Invalid server name: {e}")))?;
        let content_type = HeaderValue::from_str(&config.content_type)
            .map_err(|e| EchoError::Config(format!("Invalid content type: {e}")))?;

        Ok(Self {
            framing: config.framing,
            read_timeout: config.read_timeout,
            max_body_size: config.max_body_size,
            server_name,
            content_type,
        })
    }

    /// Handles one request; failures are turned into error responses
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if request.method() != Method::POST {
            let method = request.method().clone();
            warn!(%method, "Rejecting non-POST request");
            let mut response = self.reply(
                StatusCode::METHOD_NOT_ALLOWED,
                Bytes::from(format!(
                    "Method {method} not allowed. Only POST requests are accepted."
                )),
            );
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("POST"));
            return response;
        }

        info!(
            content_length = ?header_str(request.headers(), CONTENT_LENGTH),
            transfer_encoding = ?header_str(request.headers(), TRANSFER_ENCODING),
            "Handling echo request"
        );

        let limited = Limited::new(request.into_body(), self.max_body_size);
        let body = match timeout(self.read_timeout, limited.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                warn!(limit = self.max_body_size, "Request body too large");
                return self.reply(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Bytes::from_static(b"Request body too large"),
                );
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read request body");
                return self.reply(
                    StatusCode::BAD_REQUEST,
                    Bytes::from_static(b"Failed to read request body"),
                );
            }
            Err(_) => {
                warn!(timeout = ?self.read_timeout, "Request body read timeout");
                return self.reply(
                    StatusCode::REQUEST_TIMEOUT,
                    Bytes::from_static(b"Request body read timeout"),
                );
            }
        };

        info!(size = body.len(), "Read request body");

        match self.echo(body) {
            Ok(echoed) => {
                debug!(size = echoed.len(), framing = %self.framing, "Echoing body");
                self.reply(StatusCode::OK, echoed)
            }
            Err(e) => {
                warn!(error = %e, framing = %self.framing, "Rejecting malformed body");
                self.reply(StatusCode::BAD_REQUEST, Bytes::from(e.to_string()))
            }
        }
    }

    fn echo(&self, body: Bytes) -> Result<Bytes> {
        let payload = self.framing.decode(body)?;
        self.framing.encode(payload)
    }

    fn reply(&self, status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, self.content_type.clone());
        if let Some(server_name) = &self.server_name {
            headers.insert(SERVER, server_name.clone());
        }

        response
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
