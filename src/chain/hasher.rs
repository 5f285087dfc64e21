//! Hash functions and the hasher pool
//!
//! Hash functions are injected through a [`HashFactory`] producing fresh,
//! resettable [`DynDigest`] instances of a fixed output size. Readers keep a
//! pool of them so integrity checks do not allocate a hasher per record.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use sha2::digest::DynDigest;
use sha2::Sha256;

use crate::error::{ChainError, Result};

/// Digests up to this size are verified without a heap buffer
const INLINE_DIGEST_SIZE: usize = 64;

/// A boxed hash function instance
pub type BoxedHasher = Box<dyn DynDigest + Send>;

/// Produces fresh hash function instances
pub type HashFactory = Arc<dyn Fn() -> BoxedHasher + Send + Sync>;

/// Default factory: SHA-256 (32 byte digests)
pub fn sha256_factory() -> HashFactory {
    Arc::new(|| -> BoxedHasher { Box::new(Sha256::default()) })
}

/// Feed `input` to `hasher` and write the digest into `out`.
///
/// Fails with `DigestSize` unless `out` is exactly `hasher.output_size()`
/// bytes. The hasher is left reset.
pub fn digest_into(hasher: &mut dyn DynDigest, input: &[u8], out: &mut [u8]) -> Result<()> {
    let expected = hasher.output_size();
    let actual = out.len();
    hasher.reset();
    hasher.update(input);
    hasher
        .finalize_into_reset(out)
        .map_err(|_| ChainError::DigestSize { expected, actual })
}

/// Pool of reusable hashers.
///
/// Every acquisition yields an instance no other caller holds. Under
/// contention the pool simply creates more instances.
pub struct HasherPool {
    factory: HashFactory,
    idle: SegQueue<BoxedHasher>,
    hash_size: usize,
}

impl HasherPool {
    /// Create a pool. One instance is created up front to learn the digest
    /// size and kept for reuse.
    pub fn new(factory: HashFactory) -> Self {
        let first = factory();
        let hash_size = first.output_size();
        let idle = SegQueue::new();
        idle.push(first);
        Self {
            factory,
            idle,
            hash_size,
        }
    }

    /// Digest size of the pooled hash function
    pub fn hash_size(&self) -> usize {
        self.hash_size
    }

    /// Number of idle instances
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Take a reset hasher out of the pool. It returns on drop.
    pub fn acquire(&self) -> PooledHasher<'_> {
        let mut hasher = self.idle.pop().unwrap_or_else(|| (self.factory)());
        hasher.reset();
        PooledHasher {
            pool: self,
            hasher: Some(hasher),
        }
    }

    /// Hash `input` and compare against `expected` byte for byte
    pub fn verify(&self, input: &[u8], expected: &[u8]) -> Result<bool> {
        if expected.len() != self.hash_size {
            return Ok(false);
        }
        let mut hasher = self.acquire();
        if self.hash_size <= INLINE_DIGEST_SIZE {
            let mut inline = [0u8; INLINE_DIGEST_SIZE];
            let computed = &mut inline[..self.hash_size];
            digest_into(&mut **hasher, input, computed)?;
            Ok(computed == expected)
        } else {
            let mut computed = vec![0u8; self.hash_size];
            digest_into(&mut **hasher, input, &mut computed)?;
            Ok(computed == expected)
        }
    }
}

impl fmt::Debug for HasherPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasherPool")
            .field("hash_size", &self.hash_size)
            .field("idle", &self.idle.len())
            .finish()
    }
}

/// A hasher on loan from a [`HasherPool`]
pub struct PooledHasher<'a> {
    pool: &'a HasherPool,
    hasher: Option<BoxedHasher>,
}

impl Deref for PooledHasher<'_> {
    type Target = BoxedHasher;

    fn deref(&self) -> &Self::Target {
        self.hasher.as_ref().expect("hasher present until drop")
    }
}

impl DerefMut for PooledHasher<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.hasher.as_mut().expect("hasher present until drop")
    }
}

impl Drop for PooledHasher<'_> {
    fn drop(&mut self) {
        if let Some(hasher) = self.hasher.take() {
            self.pool.idle.push(hasher);
        }
    }
}
