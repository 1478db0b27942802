//! Sharded exact-pattern index: full pattern text -> terminal node.
//!
//! Deletes name a pattern by its text; this index resolves that text to the
//! automaton node whose record must be closed, without re-walking the trie.
//!
//! # Performance
//!
//! - **16 shards**: reduces lock contention between concurrent writers
//! - **Hash-based routing**: shard chosen from the text's Fx hash
//! - **Independent locks**: lookups in different shards never block each other

use std::hash::BuildHasher;

use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::types::NodeId;

/// Number of shards for the index.
pub(crate) const NUM_SHARDS: usize = 16;

/// Sharded map from pattern text to terminal node id.
///
/// Only the first-seen entry for a given text is recorded. Because the trie
/// is keyed per token, a re-added identical text reaches the same terminal
/// node anyway, so the first entry stays correct.
#[derive(Debug)]
pub struct PatternIndex {
    shards: [RwLock<FxHashMap<Box<str>, NodeId>>; NUM_SHARDS],
}

impl Default for PatternIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternIndex {
    /// Creates a new empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| RwLock::new(FxHashMap::default())),
        }
    }

    #[inline]
    fn shard_index(text: &str) -> usize {
        (FxBuildHasher.hash_one(text) as usize) % NUM_SHARDS
    }

    /// Records `text -> node` unless `text` is already present.
    ///
    /// Returns the node stored for `text` after the call.
    pub fn insert_first(&self, text: &str, node: NodeId) -> NodeId {
        let shard = &self.shards[Self::shard_index(text)];
        if let Some(&existing) = shard.read().get(text) {
            return existing;
        }
        *shard.write().entry(text.into()).or_insert(node)
    }

    /// Resolves a pattern text to its terminal node.
    #[must_use]
    pub fn get(&self, text: &str) -> Option<NodeId> {
        self.shards[Self::shard_index(text)]
            .read()
            .get(text)
            .copied()
    }

    /// Returns the number of distinct pattern texts across all shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// Returns true if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }
}
