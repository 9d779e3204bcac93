//! Deterministic request payloads and echo verification

use crate::{EchoError, Result};
use bytes::Bytes;

/// Number of bytes in the default payload
pub const DEFAULT_PAYLOAD_LEN: usize = 1111;
/// Value every byte of the default payload is set to
pub const DEFAULT_FILL: u8 = 1;

/// A fixed-length byte payload with a single fill value
///
/// The payload is cheap to clone: every clone shares the same buffer,
/// so one instance can be sent many times without reallocating.
///
/// # Examples
///
/// ```
/// use echoprobe::Payload;
///
/// let payload = Payload::default();
/// assert_eq!(payload.len(), 1111);
/// assert!(payload.verify(&vec![1u8; 1111]).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Bytes,
}

impl Payload {
    /// Creates a payload of `len` bytes, each set to `fill`
    pub fn filled(len: usize, fill: u8) -> Self {
        Self {
            bytes: Bytes::from(vec![fill; len]),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a handle to the payload bytes
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Checks that `echoed` is byte-for-byte identical to this payload
    pub fn verify(&self, echoed: &[u8]) -> Result<()> {
        if self.bytes.as_ref() == echoed {
            return Ok(());
        }

        let first_difference = self
            .bytes
            .iter()
            .zip(echoed)
            .position(|(sent, received)| sent != received)
            .or_else(|| Some(self.bytes.len().min(echoed.len())));

        Err(EchoError::PayloadMismatch {
            expected: self.bytes.len(),
            actual: echoed.len(),
            first_difference,
        })
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::filled(DEFAULT_PAYLOAD_LEN, DEFAULT_FILL)
    }
}

impl From<Payload> for Bytes {
    fn from(payload: Payload) -> Self {
        payload.bytes
    }
}
