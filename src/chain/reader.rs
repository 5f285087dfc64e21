//! Chain reader
//!
//! Resolves record ids to byte offsets, recomputes every record's hash from
//! its predecessor's hash and rejects anything that does not match.

use std::io::{Read, Seek};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{BoxError, ChainError, Result};

use super::codec::MessageCodec;
use super::hasher::{HashFactory, HasherPool};
use super::io::{read_at, store_len};
use super::record::{Record, RecordLayout, RecordView};

/// Where a read or an iteration starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The last complete record in the store
    Last,
    /// A specific record id
    Id(u64),
}

impl From<u64> for Position {
    fn from(id: u64) -> Self {
        Position::Id(id)
    }
}

/// Reads and validates records from a hash chain store
///
/// ## Concurrency
/// The reader holds no chain state. The store handle sits behind a mutex
/// that is held only for each seek + read pair; hashing and decoding run
/// outside of it, with hashers taken from an internal pool. Any number of
/// threads may call `read` and `iterate` at once.
pub struct Reader<S, C> {
    store: Mutex<S>,
    codec: C,
    pool: HasherPool,
    layout: RecordLayout,
}

impl<S: Read + Seek + Send, C: MessageCodec> Reader<S, C> {
    /// Create a reader. No I/O happens here.
    pub fn new(store: S, factory: HashFactory, codec: C) -> Self {
        let pool = HasherPool::new(factory);
        let layout = RecordLayout::new(codec.message_size(), pool.hash_size());
        Self {
            store: Mutex::new(store),
            codec,
            pool,
            layout,
        }
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Number of complete records currently in the store
    pub fn len(&self) -> Result<u64> {
        let len = store_len(&mut *self.store.lock())?;
        Ok(self.layout.record_count(len))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Id of the last complete record, `None` for an empty store
    pub fn last_id(&self) -> Result<Option<u64>> {
        let len = store_len(&mut *self.store.lock())?;
        Ok(self.layout.last_id(len))
    }

    /// Read and validate record `id`
    pub fn read(&self, id: u64) -> Result<Record<C::Message>> {
        let mut buf = vec![0u8; self.layout.chained_size()];
        self.load(id, &mut buf)?;
        self.check(id, &buf)?;

        let (input, hash) = self.layout.split_chained(&buf);
        let (_, timestamp, message) = self.layout.split_input(input);
        Ok(Record {
            id,
            timestamp,
            message: self.decode(id, message)?,
            hash: Bytes::copy_from_slice(hash),
        })
    }

    /// Read and validate the last record. `NotFound` on an empty store.
    pub fn read_last(&self) -> Result<Record<C::Message>> {
        match self.last_id()? {
            Some(id) => self.read(id),
            None => Err(ChainError::NotFound),
        }
    }

    /// Read the record at `position`
    pub fn read_at(&self, position: Position) -> Result<Record<C::Message>> {
        match position {
            Position::Last => self.read_last(),
            Position::Id(id) => self.read(id),
        }
    }

    /// Visit records from `start` down to id 0.
    ///
    /// Iteration runs backwards because validating record `n` needs the hash
    /// of record `n - 1`, read together with it. The visitor returns
    /// `Ok(false)` to stop early; a visitor error stops iteration and is
    /// returned wrapped with the record id.
    ///
    /// Starting from `Position::Last` on an empty store visits nothing.
    /// Starting from an id that does not exist fails with `NotFound`.
    ///
    /// The [`RecordView`] handed to `visit` borrows a buffer that is reused
    /// for the next record.
    pub fn iterate<F, E>(&self, start: Position, mut visit: F) -> Result<()>
    where
        F: FnMut(RecordView<'_, C::Message>) -> std::result::Result<bool, E>,
        E: Into<BoxError>,
    {
        let start_id = match start {
            Position::Id(id) => id,
            Position::Last => match self.last_id()? {
                Some(id) => id,
                None => return Ok(()),
            },
        };

        self.walk(start_id, |id, buf| {
            let (input, hash) = self.layout.split_chained(buf);
            let (_, timestamp, message_bytes) = self.layout.split_input(input);
            let view = RecordView {
                id,
                timestamp,
                message: self.decode(id, message_bytes)?,
                message_bytes,
                hash,
            };
            visit(view).map_err(|e| ChainError::Visit {
                id,
                source: e.into(),
            })
        })
    }

    /// Validate the whole chain from the last record down to the first.
    ///
    /// Returns the number of records checked. Unlike `iterate`, a store whose
    /// length is not a whole number of records is an error here.
    pub fn verify(&self) -> Result<u64> {
        let len = store_len(&mut *self.store.lock())?;
        self.layout.check_len(len)?;

        let last_id = match self.layout.last_id(len) {
            Some(id) => id,
            None => return Ok(0),
        };

        let mut checked = 0u64;
        self.walk(last_id, |_, _| {
            checked += 1;
            Ok(true)
        })?;

        debug!(records = checked, "verified hash chain");
        Ok(checked)
    }

    /// Walk validated chained buffers from `start_id` down to 0.
    ///
    /// Only the record bytes and the predecessor hash are read per step; the
    /// record's own hash is the predecessor hash carried over from the step
    /// before.
    fn walk<F>(&self, start_id: u64, mut step: F) -> Result<()>
    where
        F: FnMut(u64, &[u8]) -> Result<bool>,
    {
        let hash_size = self.layout.hash_size();
        let record_size = self.layout.record_size();

        let mut buf = vec![0u8; self.layout.chained_size()];
        self.load(start_id, &mut buf)?;

        let mut id = start_id;
        loop {
            self.check(id, &buf)?;
            trace!(id, "visiting record");

            if !step(id, &buf[..])? || id == 0 {
                return Ok(());
            }

            // hash(id - 1) was just validated as the chain input of `id`
            buf.copy_within(..hash_size, record_size);
            id -= 1;
            self.load_input(id, &mut buf[..record_size])?;
        }
    }

    /// Fill `buf` (`chained_size` bytes) with the predecessor hash and the
    /// full record `id`.
    fn load(&self, id: u64, buf: &mut [u8]) -> Result<()> {
        let hash_size = self.layout.hash_size();
        let result = if id == 0 {
            buf[..hash_size].fill(0);
            read_at(&mut *self.store.lock(), 0, &mut buf[hash_size..])
        } else {
            let offset = self.chained_offset(id)?;
            read_at(&mut *self.store.lock(), offset, buf)
        };

        match result {
            // Only the predecessor's hash exists: record `id` is past the end
            Err(ChainError::IncompleteRead { actual, .. }) if id > 0 && actual <= hash_size => {
                Err(ChainError::NotFound)
            }
            other => other,
        }
    }

    /// Fill `input` (`record_size` bytes) with the hash input of record `id`
    fn load_input(&self, id: u64, input: &mut [u8]) -> Result<()> {
        let hash_size = self.layout.hash_size();
        if id == 0 {
            input[..hash_size].fill(0);
            read_at(&mut *self.store.lock(), 0, &mut input[hash_size..])
        } else {
            let offset = self.chained_offset(id)?;
            read_at(&mut *self.store.lock(), offset, input)
        }
    }

    /// Ids whose offset is beyond what a store can seek to cannot exist
    fn chained_offset(&self, id: u64) -> Result<u64> {
        self.layout
            .chained_offset_of(id)
            .filter(|offset| *offset <= i64::MAX as u64)
            .ok_or(ChainError::NotFound)
    }

    fn decode(&self, id: u64, bytes: &[u8]) -> Result<C::Message> {
        self.codec.decode(bytes).map_err(|e| ChainError::Decode {
            id,
            source: Box::new(e),
        })
    }

    fn check(&self, id: u64, buf: &[u8]) -> Result<()> {
        let (input, stored) = self.layout.split_chained(buf);
        if !self.pool.verify(input, stored)? {
            warn!(id, "hash chain integrity check failed");
            return Err(ChainError::Integrity { id });
        }
        Ok(())
    }

    /// Give back the underlying store
    pub fn into_inner(self) -> S {
        self.store.into_inner()
    }
}
