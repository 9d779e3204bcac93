//! Deferred request bodies
//!
//! A deferred body lets a request go out before its content exists. The
//! caller keeps a [`DeferredWriter`] and pushes chunks into it after the
//! request has been handed to the client; closing the writer ends the
//! body. The body never reports a length, so HTTP/1.1 sends it chunked.

use crate::{EchoError, Result};
use bytes::Bytes;
use http_body::{Body, Frame};
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Creates a connected writer/body pair
///
/// `capacity` is the number of chunks that may be queued before
/// [`DeferredWriter::write`] waits for the connection to catch up.
pub fn deferred(capacity: usize) -> (DeferredWriter, DeferredBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (DeferredWriter { tx }, DeferredBody { rx })
}

/// Output handle feeding a [`DeferredBody`]
#[derive(Debug)]
pub struct DeferredWriter {
    tx: mpsc::Sender<Bytes>,
}

impl DeferredWriter {
    /// Queues a chunk of body content
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<()> {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Ok(());
        }

        self.tx
            .send(chunk)
            .await
            .map_err(|_| EchoError::Closed("Request body is no longer being sent".to_string()))
    }

    /// Ends the body; dropping the writer has the same effect
    pub fn close(self) {}
}

/// Request body whose content arrives through a [`DeferredWriter`]
#[derive(Debug)]
pub struct DeferredBody {
    rx: mpsc::Receiver<Bytes>,
}

impl Body for DeferredBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        self.rx
            .poll_recv(cx)
            .map(|chunk| chunk.map(|data| Ok(Frame::data(data))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_deferred_body_yields_written_chunks() {
        let (mut writer, body) = deferred(4);

        writer.write(Bytes::from_static(b"hello ")).await.unwrap();
        writer.write(Bytes::from_static(b"")).await.unwrap();
        writer.write(b"world".to_vec()).await.unwrap();
        writer.close();

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"hello world");
    }

    #[tokio::test]
    async fn test_deferred_body_has_unknown_length() {
        let (_writer, body) = deferred(1);
        assert_eq!(body.size_hint().exact(), None);
    }

    #[tokio::test]
    async fn test_write_after_body_dropped() {
        let (mut writer, body) = deferred(1);
        drop(body);

        let err = writer.write(Bytes::from_static(b"late")).await.unwrap_err();
        assert!(matches!(err, EchoError::Closed(_)));
    }

    #[tokio::test]
    async fn test_writer_waits_for_reader() {
        let (mut writer, mut body) = deferred(1);

        let producer = tokio::spawn(async move {
            for _ in 0..3 {
                writer.write(Bytes::from_static(b"ab")).await.unwrap();
            }
        });

        let mut received = Vec::new();
        while let Some(frame) = body.frame().await {
            if let Ok(data) = frame.unwrap().into_data() {
                received.extend_from_slice(&data);
            }
        }

        producer.await.unwrap();
        assert_eq!(received, b"ababab");
    }
}
