//! Body framing for the two echo variants
//!
//! The raw variant sends the payload as the whole body and relies on HTTP
//! to delimit it. The length-prefixed variant puts a 4-byte big-endian
//! length in front of the payload so the echoed body can be checked
//! against an explicit length.

use crate::{EchoError, Result};
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::str::FromStr;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Width of the length prefix in bytes
pub const LENGTH_PREFIX_LEN: usize = 4;
/// Largest payload accepted inside a length-prefixed frame
pub const MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// How a payload is laid out inside an HTTP body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Body is the payload, nothing more
    #[default]
    Raw,
    /// Body is a 4-byte big-endian length followed by the payload
    LengthPrefixed,
}

impl Framing {
    /// Wraps a payload into a body
    pub fn encode(&self, payload: Bytes) -> Result<Bytes> {
        match self {
            Framing::Raw => Ok(payload),
            Framing::LengthPrefixed => {
                let mut dst = BytesMut::with_capacity(LENGTH_PREFIX_LEN + payload.len());
                codec()
                    .encode(payload, &mut dst)
                    .map_err(|e| EchoError::Framing(format!("Failed to encode frame: {e}")))?;
                Ok(dst.freeze())
            }
        }
    }

    /// Extracts the payload from a body
    ///
    /// For length-prefixed bodies the declared length must match the
    /// number of bytes that follow the prefix exactly.
    pub fn decode(&self, body: Bytes) -> Result<Bytes> {
        match self {
            Framing::Raw => Ok(body),
            Framing::LengthPrefixed => {
                let mut src = BytesMut::from(&body[..]);
                let frame = codec()
                    .decode(&mut src)
                    .map_err(|e| EchoError::Framing(format!("Failed to decode frame: {e}")))?
                    .ok_or_else(|| {
                        EchoError::Framing(format!(
                            "Truncated frame: {} bytes available, declared length {}",
                            body.len(),
                            declared_len(&body)
                                .map(|len| len.to_string())
                                .unwrap_or_else(|| "missing".to_string()),
                        ))
                    })?;

                if !src.is_empty() {
                    return Err(EchoError::Framing(format!(
                        "{} trailing bytes after a {}-byte frame",
                        src.len(),
                        frame.len()
                    )));
                }

                Ok(frame.freeze())
            }
        }
    }
}

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(LENGTH_PREFIX_LEN)
        .big_endian()
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

fn declared_len(body: &[u8]) -> Option<u32> {
    let prefix: [u8; LENGTH_PREFIX_LEN] = body.get(..LENGTH_PREFIX_LEN)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix))
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::Raw => write!(f, "raw"),
            Framing::LengthPrefixed => write!(f, "length-prefixed"),
        }
    }
}

impl FromStr for Framing {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(Framing::Raw),
            "length-prefixed" => Ok(Framing::LengthPrefixed),
            other => Err(EchoError::Config(format!(
                "Unknown framing '{other}', expected 'raw' or 'length-prefixed'"
            ))),
        }
    }
}
