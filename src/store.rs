//! Store adapters
//!
//! The chain engine works over any byte-addressable `Read + Write + Seek`
//! handle. `Store` adds an explicit durability hook on top of that.
//!
//! ## Handles
//! Several handles may point at the same underlying bytes (two opens of the
//! same file, or clones of a [`MemStore`]). Each handle keeps its own cursor.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::RwLock;

/// A byte store the writer can append to
pub trait Store: Read + Write + Seek + Send {
    /// Make appended bytes durable. Defaults to `flush`.
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Store for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl Store for Cursor<Vec<u8>> {}

/// In-memory store whose clones share one buffer but keep separate cursors
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    data: Arc<RwLock<Vec<u8>>>,
    pos: u64,
}

impl MemStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(RwLock::new(bytes.into())),
            pos: 0,
        }
    }

    /// Total length of the shared buffer
    pub fn len(&self) -> u64 {
        self.data.read().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of the shared buffer
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// XOR the byte at `offset` with `mask`. Returns false if out of range.
    pub fn corrupt(&self, offset: u64, mask: u8) -> bool {
        let mut data = self.data.write();
        match data.get_mut(offset as usize) {
            Some(byte) => {
                *byte ^= mask;
                true
            }
            None => false,
        }
    }

    /// Cut the shared buffer down to `len` bytes
    pub fn truncate(&self, len: u64) {
        self.data.write().truncate(len as usize);
    }
}

impl Read for MemStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.read();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.write();
        let start = self.pos as usize;
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(n) => {
                self.pos = n;
                return Ok(n);
            }
            SeekFrom::End(delta) => (self.len(), delta),
            SeekFrom::Current(delta) => (self.pos, delta),
        };
        match base.checked_add_signed(delta) {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

impl Store for MemStore {}
