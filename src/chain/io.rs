//! Positional read helper shared by the writer and the reader

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::{ChainError, Result};

/// Fill `buf` with the bytes starting at `offset`.
///
/// - nothing at `offset` (at or past the end) → `NotFound`
/// - fewer bytes than `buf.len()` → `IncompleteRead`
///
/// The seek and the reads must not interleave with other users of the same
/// handle; callers hold the handle exclusively for the duration.
pub(crate) fn read_at<R: Read + Seek + ?Sized>(
    store: &mut R,
    offset: u64,
    buf: &mut [u8],
) -> Result<()> {
    let pos = store
        .seek(SeekFrom::Start(offset))
        .map_err(|e| ChainError::io(format!("seek {}", offset), e))?;
    if pos != offset {
        return Err(ChainError::NotFound);
    }

    let mut filled = 0;
    while filled < buf.len() {
        match store.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ChainError::io(format!("read {}", offset), e)),
        }
    }

    if filled == 0 && !buf.is_empty() {
        return Err(ChainError::NotFound);
    }
    if filled != buf.len() {
        return Err(ChainError::IncompleteRead {
            offset,
            expected: buf.len(),
            actual: filled,
        });
    }
    Ok(())
}

/// Length of the store, leaving the cursor at the end
pub(crate) fn store_len<S: Seek + ?Sized>(store: &mut S) -> Result<u64> {
    store
        .seek(SeekFrom::End(0))
        .map_err(|e| ChainError::io("seek to the end of the log", e))
}
