//! Message codecs
//!
//! A codec maps a logical message type to exactly `message_size` bytes and
//! back. The chain engine only ever sees the raw bytes.

use bytes::Bytes;

use crate::error::{ChainError, Result};

/// Fixed-width encoding of chain messages
pub trait MessageCodec: Send + Sync {
    /// Logical message type
    type Message;

    /// Number of bytes every encoded message occupies
    fn message_size(&self) -> usize;

    /// Encode `message` into `buf` (exactly `message_size` bytes long) and
    /// return the number of bytes written. Anything other than
    /// `message_size` is rejected by the writer.
    fn encode(&self, message: &Self::Message, buf: &mut [u8]) -> Result<usize>;

    /// Decode exactly `message_size` bytes
    fn decode(&self, bytes: &[u8]) -> Result<Self::Message>;
}

/// Messages are raw byte strings of exactly the configured size
#[derive(Debug, Clone, Copy)]
pub struct RawCodec {
    size: usize,
}

impl RawCodec {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl MessageCodec for RawCodec {
    type Message = Bytes;

    fn message_size(&self) -> usize {
        self.size
    }

    fn encode(&self, message: &Bytes, buf: &mut [u8]) -> Result<usize> {
        if message.len() != self.size {
            return Err(ChainError::InvalidMessageSize {
                expected: self.size,
                actual: message.len(),
            });
        }
        buf[..message.len()].copy_from_slice(message);
        Ok(message.len())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(bytes))
    }
}

/// UTF-8 strings of up to the configured size, zero padded on storage.
///
/// Trailing zero bytes are stripped on decode, so strings that themselves end
/// in NUL characters do not round-trip.
#[derive(Debug, Clone, Copy)]
pub struct PaddedStrCodec {
    size: usize,
}

impl PaddedStrCodec {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl MessageCodec for PaddedStrCodec {
    type Message = String;

    fn message_size(&self) -> usize {
        self.size
    }

    fn encode(&self, message: &String, buf: &mut [u8]) -> Result<usize> {
        let raw = message.as_bytes();
        if raw.len() > self.size {
            return Err(ChainError::InvalidMessageSize {
                expected: self.size,
                actual: raw.len(),
            });
        }
        buf[..raw.len()].copy_from_slice(raw);
        buf[raw.len()..self.size].fill(0);
        Ok(self.size)
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        let end = bytes
            .iter()
            .rposition(|&b| b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        String::from_utf8(bytes[..end].to_vec())
            .map_err(|e| ChainError::Codec(format!("invalid utf-8 message: {}", e)))
    }
}
