//! Hash Chain Module
//!
//! Append-only log of fixed-size records, each carrying a hash over the
//! previous record's hash and its own contents.
//!
//! ## Responsibilities
//! - Fixed-width record layout and offset arithmetic
//! - Appending records under a single writer lock
//! - Reconstructing the chain head from the store on open
//! - Random access and backward iteration with integrity checks
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Record 0                                 │
//! │ ┌───────────┬─────────────┬────────────┐ │
//! │ │ Time (8)  │ Message (M) │  Hash (H)  │ │
//! │ └───────────┴─────────────┴────────────┘ │
//! ├──────────────────────────────────────────┤
//! │ Record 1                                 │
//! │ ┌───────────┬─────────────┬────────────┐ │
//! │ │ Time (8)  │ Message (M) │  Hash (H)  │ │
//! │ └───────────┴─────────────┴────────────┘ │
//! └──────────────────────────────────────────┘
//!
//! hash(n) = H(hash(n-1) | time(n) | message(n)),  hash(-1) = zero(H)
//! ```

mod codec;
mod hasher;
mod io;
mod reader;
mod record;
mod writer;

pub use codec::{MessageCodec, PaddedStrCodec, RawCodec};
pub use hasher::{digest_into, sha256_factory, BoxedHasher, HashFactory, HasherPool, PooledHasher};
pub use reader::{Position, Reader};
pub use record::{
    decode_timestamp, encode_timestamp, system_time, timestamp_nanos, Record, RecordLayout,
    RecordView, TIMESTAMP_SIZE,
};
pub use writer::Writer;
