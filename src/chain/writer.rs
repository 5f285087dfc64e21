//! Chain writer
//!
//! Appends records to the end of a store, chaining each record's hash to the
//! hash of the record before it.

use std::io::Write;
use std::time::SystemTime;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::{ChainConfig, SyncStrategy};
use crate::error::{ChainError, Result};
use crate::store::Store;

use super::codec::MessageCodec;
use super::hasher::{digest_into, BoxedHasher, HashFactory};
use super::io::{read_at, store_len};
use super::record::{encode_timestamp, timestamp_nanos, RecordLayout, TIMESTAMP_SIZE};

/// Appends records to a hash chain store
///
/// ## Concurrency
/// One mutex guards the whole encode → hash → append → advance sequence, so
/// concurrent `write` calls serialize and no caller observes a half-updated
/// chain head.
///
/// ## State
/// The chain head and the last record id are derived from the store when the
/// writer is created, and derived again if whole records were appended behind
/// the writer's back. Nothing else is persisted.
pub struct Writer<S, C> {
    codec: C,
    layout: RecordLayout,
    sync_strategy: SyncStrategy,
    state: Mutex<WriterState<S>>,
}

struct WriterState<S> {
    store: S,
    hasher: BoxedHasher,
    /// Hash of the last appended record, zero before the first one
    head: Vec<u8>,
    last_id: Option<u64>,
    /// Scratch: prev hash | timestamp | message | new hash
    buf: Vec<u8>,
    /// Records appended since the last sync
    unsynced: usize,
}

impl<S: Store, C: MessageCodec> Writer<S, C> {
    /// Create a writer over `store`, reconstructing the chain head from the
    /// bytes already in it.
    ///
    /// Fails with `Truncated` if the store length is not a whole number of
    /// records.
    pub fn new(mut store: S, factory: HashFactory, codec: C, config: &ChainConfig) -> Result<Self> {
        config.validate()?;
        if codec.message_size() != config.message_size {
            return Err(ChainError::Config(format!(
                "codec message size {} does not match configured size {}",
                codec.message_size(),
                config.message_size
            )));
        }

        let hasher = factory();
        let hash_size = hasher.output_size();
        let layout = RecordLayout::new(config.message_size, hash_size);

        let len = store_len(&mut store)?;
        layout.check_len(len)?;

        let mut head = vec![0u8; hash_size];
        if len > hash_size as u64 {
            read_at(&mut store, len - hash_size as u64, &mut head)?;
        }
        let last_id = layout.last_id(len);

        debug!(
            len,
            record_size = layout.record_size(),
            last_id = ?last_id,
            "opened hash chain writer"
        );

        Ok(Self {
            codec,
            layout,
            sync_strategy: config.sync_strategy,
            state: Mutex::new(WriterState {
                store,
                hasher,
                head,
                last_id,
                buf: vec![0u8; layout.chained_size()],
                unsynced: 0,
            }),
        })
    }

    /// Append `message` with the given nanosecond timestamp.
    ///
    /// Returns the id assigned to the record and its chain hash. Fails with
    /// `Truncated` if the store ends inside a record, which is what a failed
    /// append leaves behind; the chain head is not touched in that case.
    pub fn write(&self, timestamp: i64, message: &C::Message) -> Result<(u64, Bytes)> {
        let mut guard = self.state.lock();
        let WriterState {
            store,
            hasher,
            head,
            last_id,
            buf,
            unsynced,
        } = &mut *guard;

        let hash_size = self.layout.hash_size();
        let message_size = self.layout.message_size();
        let record_size = self.layout.record_size();
        let (input, hash) = buf.split_at_mut(record_size);

        let message_buf = &mut input[hash_size + TIMESTAMP_SIZE..];
        let written = self.codec.encode(message, message_buf)?;
        if written != message_size {
            return Err(ChainError::IncompleteWrite {
                expected: message_size,
                written,
            });
        }

        let offset = store_len(store)?;
        self.layout.check_len(offset)?;

        let mut id = last_id.map_or(0, |last| last + 1);
        if Some(offset) != self.layout.offset_of(id) {
            let tail_id = self.layout.last_id(offset);
            warn!(
                offset,
                last_id = ?last_id,
                tail_id = ?tail_id,
                "store end moved since the last write, re-reading the chain head"
            );
            let mut tail = vec![0u8; hash_size];
            if tail_id.is_some() {
                read_at(store, offset - hash_size as u64, &mut tail)?;
                store_len(store)?;
            }
            head.copy_from_slice(&tail);
            *last_id = tail_id;
            id = tail_id.map_or(0, |last| last + 1);
        }

        input[..hash_size].copy_from_slice(head);
        input[hash_size..hash_size + TIMESTAMP_SIZE].copy_from_slice(&encode_timestamp(timestamp));
        digest_into(&mut **hasher, input, hash)?;

        store
            .write_all(&buf[hash_size..])
            .map_err(|e| ChainError::io(format!("write record {}", id), e))?;

        head.copy_from_slice(&buf[record_size..]);
        *last_id = Some(id);
        *unsynced += 1;

        trace!(id, offset, "appended record");

        let due = match self.sync_strategy {
            SyncStrategy::Never => false,
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNRecords { count } => *unsynced >= count,
        };
        if due {
            store
                .sync()
                .map_err(|e| ChainError::io(format!("sync after record {}", id), e))?;
            *unsynced = 0;
        }

        Ok((id, Bytes::copy_from_slice(head)))
    }

    /// Append `message` stamped with the current system time
    pub fn write_now(&self, message: &C::Message) -> Result<(u64, Bytes)> {
        self.write(timestamp_nanos(SystemTime::now()), message)
    }

    /// Force a sync of everything appended so far
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.lock();
        state
            .store
            .sync()
            .map_err(|e| ChainError::io("sync", e))?;
        state.unsynced = 0;
        Ok(())
    }

    /// Id and hash of the last appended record.
    ///
    /// Fails with `LogNotInitialized` before the first record.
    pub fn head(&self) -> Result<(u64, Bytes)> {
        let state = self.state.lock();
        match state.last_id {
            Some(id) => Ok((id, Bytes::copy_from_slice(&state.head))),
            None => Err(ChainError::LogNotInitialized),
        }
    }

    /// Id of the last appended record
    pub fn last_id(&self) -> Option<u64> {
        self.state.lock().last_id
    }

    /// Id the next write will get
    pub fn next_id(&self) -> u64 {
        self.last_id().map_or(0, |id| id + 1)
    }

    /// Records appended since the last sync
    pub fn unsynced_count(&self) -> usize {
        self.state.lock().unsynced
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Give back the underlying store
    pub fn into_inner(self) -> S {
        self.state.into_inner().store
    }
}
