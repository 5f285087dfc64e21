//! Record layout
//!
//! Fixed-width binary schema of a chain record and the offset arithmetic
//! used by both the writer and the reader.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::error::{ChainError, Result};

/// Size of the big-endian nanosecond timestamp at the start of each record
pub const TIMESTAMP_SIZE: usize = 8;

/// Byte layout of records in a store.
///
/// ```text
/// record(id):  timestamp(8) | message(M) | hash(H)
/// ```
///
/// The hash input of record `id` is `hash(id-1) | timestamp | message`, which
/// is exactly `record_size` bytes long. Reading the previous record's trailing
/// hash together with the current record therefore yields the hash input
/// followed by the stored hash in one contiguous buffer:
///
/// ```text
/// offset id*R - H:  hash(id-1)(H) | timestamp(8) | message(M) | hash(id)(H)
///                   '------------- hash input (R) -----------'
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    message_size: usize,
    hash_size: usize,
}

impl RecordLayout {
    pub fn new(message_size: usize, hash_size: usize) -> Self {
        Self {
            message_size,
            hash_size,
        }
    }

    pub fn message_size(&self) -> usize {
        self.message_size
    }

    pub fn hash_size(&self) -> usize {
        self.hash_size
    }

    /// Size of one record on storage
    pub fn record_size(&self) -> usize {
        TIMESTAMP_SIZE + self.message_size + self.hash_size
    }

    /// Size of the buffer holding a record and its predecessor's hash
    pub fn chained_size(&self) -> usize {
        self.hash_size + self.record_size()
    }

    /// Offset of the first byte of record `id`, `None` if it does not fit
    /// in a `u64`
    pub fn offset_of(&self, id: u64) -> Option<u64> {
        id.checked_mul(self.record_size() as u64)
    }

    /// Offset of the first byte to read for validating record `id`.
    ///
    /// For `id > 0` this is the start of the previous record's hash; record 0
    /// has no predecessor and starts at 0.
    pub fn chained_offset_of(&self, id: u64) -> Option<u64> {
        if id == 0 {
            Some(0)
        } else {
            self.offset_of(id)?.checked_sub(self.hash_size as u64)
        }
    }

    /// Number of complete records in a store of `len` bytes
    pub fn record_count(&self, len: u64) -> u64 {
        len / self.record_size() as u64
    }

    /// Id of the last complete record, if any
    pub fn last_id(&self, len: u64) -> Option<u64> {
        self.record_count(len).checked_sub(1)
    }

    /// Fail unless `len` is an exact multiple of the record size
    pub fn check_len(&self, len: u64) -> Result<()> {
        let record_size = self.record_size() as u64;
        if len % record_size != 0 {
            return Err(ChainError::Truncated { len, record_size });
        }
        Ok(())
    }

    /// Split a chained buffer into `(hash input, stored hash)`
    pub fn split_chained<'a>(&self, buf: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        buf.split_at(self.record_size())
    }

    /// Split a hash input into `(previous hash, timestamp, message)`
    pub fn split_input<'a>(&self, input: &'a [u8]) -> (&'a [u8], i64, &'a [u8]) {
        let (prev, rest) = input.split_at(self.hash_size);
        let (ts, message) = rest.split_at(TIMESTAMP_SIZE);
        (prev, decode_timestamp(ts), &message[..self.message_size])
    }
}

/// Encode a nanosecond timestamp as stored on disk
pub fn encode_timestamp(timestamp: i64) -> [u8; TIMESTAMP_SIZE] {
    timestamp.to_be_bytes()
}

/// Decode a stored timestamp. `bytes` must hold at least 8 bytes.
pub fn decode_timestamp(bytes: &[u8]) -> i64 {
    let mut raw = [0u8; TIMESTAMP_SIZE];
    raw.copy_from_slice(&bytes[..TIMESTAMP_SIZE]);
    i64::from_be_bytes(raw)
}

/// Nanoseconds since the Unix epoch for `time`, saturating at the i64 range
pub fn timestamp_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos())
            .map(|n| -n)
            .unwrap_or(i64::MIN),
    }
}

/// Inverse of [`timestamp_nanos`]
pub fn system_time(timestamp: i64) -> SystemTime {
    let magnitude = Duration::from_nanos(timestamp.unsigned_abs());
    if timestamp >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}

/// An owned, validated record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<T> {
    /// Serial number of the record, starting at 0
    pub id: u64,
    /// Nanoseconds since the Unix epoch
    pub timestamp: i64,
    /// Decoded message
    pub message: T,
    /// Chain hash validating this record and all before it
    pub hash: Bytes,
}

impl<T> Record<T> {
    pub fn time(&self) -> SystemTime {
        system_time(self.timestamp)
    }
}

/// A validated record borrowed from a reader's iteration buffer.
///
/// The borrowed slices are only valid for the duration of the visitor call
/// that receives the view; use [`RecordView::into_record`] to keep it.
#[derive(Debug)]
pub struct RecordView<'a, T> {
    pub id: u64,
    pub timestamp: i64,
    pub message: T,
    /// Raw message bytes as stored
    pub message_bytes: &'a [u8],
    pub hash: &'a [u8],
}

impl<T> RecordView<'_, T> {
    pub fn time(&self) -> SystemTime {
        system_time(self.timestamp)
    }

    /// Copy the borrowed parts into an owned record
    pub fn into_record(self) -> Record<T> {
        Record {
            id: self.id,
            timestamp: self.timestamp,
            message: self.message,
            hash: Bytes::copy_from_slice(self.hash),
        }
    }
}
