//! Identifier types shared by the dictionary, the automaton and the matcher.

use serde::{Deserialize, Serialize};

/// Logical time of an operation. Initial patterns are loaded at 0.
pub type Timestamp = u64;

/// Interned token id, dense and zero-based in order of first sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl TokenId {
    /// Returns the id as a slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a node in the automaton's node arena. Node 0 is the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The trie root. Never terminal.
    pub const ROOT: NodeId = NodeId(0);

    /// Returns the id as an arena index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true for the root node.
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}
