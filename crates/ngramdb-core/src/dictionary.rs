//! Concurrent token interning dictionary.
//!
//! Tokens are interned into dense, zero-based [`TokenId`]s in order of first
//! sighting. Ids are never reused or invalidated; the dictionary only grows.
//!
//! # Concurrency
//!
//! - **Fixed buckets**: `hash(token) & (bucket_count - 1)` selects a bucket,
//!   each holding an append-only list behind its own lock.
//! - **Check-and-insert is atomic per bucket**: two writers racing on the
//!   same new token serialize on the bucket's write lock, and the loser sees
//!   the winner's entry on its re-check.
//! - **Id counter**: guarded by its own lock, independent of the buckets.
//!
//! The bucket array is sized once at startup and never resized. Exceeding
//! `max_tokens` returns [`Error::DictionaryFull`].

use std::hash::BuildHasher;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxBuildHasher;

use crate::error::{Error, Result};
use crate::types::TokenId;

type Bucket = Vec<(Box<str>, TokenId)>;

/// Bucket-locked token interning table.
#[derive(Debug)]
pub struct TokenDictionary {
    buckets: Box<[RwLock<Bucket>]>,
    mask: usize,
    /// Next id to hand out.
    next_id: Mutex<u32>,
    max_tokens: usize,
}

impl TokenDictionary {
    /// Creates an empty dictionary.
    ///
    /// `bucket_count` is rounded up to a power of two.
    #[must_use]
    pub fn new(bucket_count: usize, max_tokens: usize) -> Self {
        let bucket_count = bucket_count.max(1).next_power_of_two();
        let buckets = (0..bucket_count)
            .map(|_| RwLock::new(Vec::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            buckets,
            mask: bucket_count - 1,
            next_id: Mutex::new(0),
            max_tokens: max_tokens.min(u32::MAX as usize),
        }
    }

    #[inline]
    fn bucket(&self, token: &str) -> &RwLock<Bucket> {
        let hash = FxBuildHasher.hash_one(token) as usize;
        &self.buckets[hash & self.mask]
    }

    fn find(bucket: &Bucket, token: &str) -> Option<TokenId> {
        bucket
            .iter()
            .find(|(candidate, _)| &**candidate == token)
            .map(|&(_, id)| id)
    }

    /// Interns a token, returning its id.
    ///
    /// The same string always yields the same id for the lifetime of the
    /// dictionary, whichever thread interned it first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DictionaryFull`] once `max_tokens` distinct tokens exist.
    pub fn intern(&self, token: &str) -> Result<TokenId> {
        let bucket = self.bucket(token);

        if let Some(id) = Self::find(&bucket.read(), token) {
            return Ok(id);
        }

        let mut entries = bucket.write();
        if let Some(id) = Self::find(&entries, token) {
            return Ok(id);
        }

        let id = self.allocate_id()?;
        entries.push((token.into(), id));
        Ok(id)
    }

    fn allocate_id(&self) -> Result<TokenId> {
        let mut next = self.next_id.lock();
        if *next as usize >= self.max_tokens {
            tracing::error!(capacity = self.max_tokens, "token dictionary exhausted");
            return Err(Error::DictionaryFull {
                capacity: self.max_tokens,
            });
        }
        let id = TokenId(*next);
        *next += 1;
        Ok(id)
    }

    /// Looks up a token without interning it.
    ///
    /// `None` means no pattern has ever contained this token.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<TokenId> {
        Self::find(&self.bucket(token).read(), token)
    }

    /// Returns the number of interned tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        *self.next_id.lock() as usize
    }

    /// Returns true if no token has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed token capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_tokens
    }

    /// Returns the number of hash buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
