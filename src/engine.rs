//! Engine Module
//!
//! File-backed hash chain: one writer and one reader over the same log file.
//!
//! ## Responsibilities
//! - Create the log file and its parent directory
//! - Open independent handles for appending and reading
//! - Reconstruct the chain head on open
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
//!
//! - **Writes**: serialized by the writer's internal lock
//! - **Reads**: any number of concurrent callers; each positional read is
//!   atomic on the reader's own file handle
//!
//! The writer and the reader never share a cursor, since each has its own
//! file handle.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::info;

use crate::chain::{
    sha256_factory, HashFactory, MessageCodec, Position, Reader, Record, RecordView, Writer,
};
use crate::config::ChainConfig;
use crate::error::{BoxError, ChainError, Result};

/// A hash chain stored in a single file
pub struct HashChain<C> {
    path: PathBuf,
    writer: Writer<File, C>,
    reader: Reader<File, C>,
}

impl<C: MessageCodec + Clone> HashChain<C> {
    /// Open or create a chain file using SHA-256
    pub fn open(path: impl AsRef<Path>, codec: C, config: &ChainConfig) -> Result<Self> {
        Self::open_with_hasher(path, codec, config, sha256_factory())
    }

    /// Open or create a chain file with a custom hash function
    pub fn open_with_hasher(
        path: impl AsRef<Path>,
        codec: C,
        config: &ChainConfig,
        factory: HashFactory,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ChainError::io(format!("create directory {}", parent.display()), e)
                })?;
            }
        }

        let write_handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| ChainError::io(format!("open {}", path.display()), e))?;
        let read_handle = File::open(&path)
            .map_err(|e| ChainError::io(format!("open {}", path.display()), e))?;

        let writer = Writer::new(write_handle, factory.clone(), codec.clone(), config)?;
        let reader = Reader::new(read_handle, factory, codec);

        info!(
            path = %path.display(),
            next_id = writer.next_id(),
            "opened hash chain"
        );

        Ok(Self {
            path,
            writer,
            reader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn writer(&self) -> &Writer<File, C> {
        &self.writer
    }

    pub fn reader(&self) -> &Reader<File, C> {
        &self.reader
    }

    /// Append a record with an explicit nanosecond timestamp
    pub fn write(&self, timestamp: i64, message: &C::Message) -> Result<(u64, Bytes)> {
        self.writer.write(timestamp, message)
    }

    /// Append a record stamped with the current time
    pub fn write_now(&self, message: &C::Message) -> Result<(u64, Bytes)> {
        self.writer.write_now(message)
    }

    pub fn read(&self, position: Position) -> Result<Record<C::Message>> {
        self.reader.read_at(position)
    }

    pub fn iterate<F, E>(&self, start: Position, visit: F) -> Result<()>
    where
        F: FnMut(RecordView<'_, C::Message>) -> std::result::Result<bool, E>,
        E: Into<BoxError>,
    {
        self.reader.iterate(start, visit)
    }

    /// Validate every record in the file
    pub fn verify(&self) -> Result<u64> {
        self.reader.verify()
    }

    pub fn sync(&self) -> Result<()> {
        self.writer.sync()
    }
}
