//! # hashchain
//!
//! A compact append-only log with integrity validation:
//! - Fixed-size, timestamped records
//! - Each record hashed together with the previous record's hash
//! - Chain head reconstructed from the log itself, no index files
//! - Single-writer / multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        HashChain                             │
//! │                 (file-backed convenience)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Writer    │          │   Reader    │
//!   │  (Mutex)    │          │ (HasherPool)│
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          └────────────┬───────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │ Record Layout │
//!               │    + Store    │
//!               └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use hashchain::chain::{sha256_factory, Position, RawCodec, Reader, Writer};
//! use hashchain::store::MemStore;
//! use hashchain::ChainConfig;
//!
//! let store = MemStore::new();
//! let config = ChainConfig::with_message_size(9);
//!
//! let writer = Writer::new(store.clone(), sha256_factory(), RawCodec::new(9), &config).unwrap();
//! writer.write(1, &Bytes::from_static(b"message 1")).unwrap();
//! writer.write(2, &Bytes::from_static(b"message 2")).unwrap();
//!
//! let reader = Reader::new(store, sha256_factory(), RawCodec::new(9));
//! assert_eq!(reader.read(1).unwrap().message, "message 2");
//!
//! let mut ids = Vec::new();
//! reader
//!     .iterate(Position::Last, |record| {
//!         ids.push(record.id);
//!         Ok::<_, hashchain::ChainError>(true)
//!     })
//!     .unwrap();
//! assert_eq!(ids, vec![1, 0]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod chain;
pub mod store;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ChainError, Result};
pub use config::{ChainConfig, SyncStrategy};
pub use chain::{Position, Reader, Record, RecordView, Writer};
pub use engine::HashChain;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hashchain
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
