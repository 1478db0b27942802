//! Fan-out aware edge storage for trie nodes.
//!
//! Most trie nodes have a handful of outgoing edges, a few have thousands.
//! A single structure penalizes one case or the other, so every node starts
//! with a flat array scanned linearly and is promoted to a hash map once its
//! fan-out crosses a threshold. Both arms honor the same [`EdgeTable`]
//! contract; lookups give identical answers before and after promotion.

use rustc_hash::FxHashMap;

use crate::types::{NodeId, TokenId};

/// Default fan-out above which a node switches to hashed edges.
pub const DEFAULT_LINEAR_EDGE_LIMIT: usize = 50;

/// Contract shared by every edge representation.
pub trait EdgeTable {
    /// Returns the child reached by `token`, if any.
    fn get(&self, token: TokenId) -> Option<NodeId>;

    /// Adds an edge. The caller guarantees `token` has no edge yet.
    fn insert(&mut self, token: TokenId, target: NodeId);

    /// Returns the number of outgoing edges.
    fn len(&self) -> usize;

    /// Returns true if the node has no outgoing edge.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flat array of edges for low fan-out nodes.
///
/// Cache-friendly sequential scan; O(n) is fast for small n.
#[derive(Debug, Clone, Default)]
pub struct LinearEdges {
    edges: Vec<(TokenId, NodeId)>,
}

impl LinearEdges {
    /// Creates an empty edge array.
    #[must_use]
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    /// Iterates over `(token, target)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, NodeId)> + '_ {
        self.edges.iter().copied()
    }
}

impl EdgeTable for LinearEdges {
    #[inline]
    fn get(&self, token: TokenId) -> Option<NodeId> {
        self.edges
            .iter()
            .find(|&&(candidate, _)| candidate == token)
            .map(|&(_, target)| target)
    }

    fn insert(&mut self, token: TokenId, target: NodeId) {
        self.edges.push((token, target));
    }

    fn len(&self) -> usize {
        self.edges.len()
    }
}

/// Hash map of edges for high fan-out nodes.
#[derive(Debug, Clone, Default)]
pub struct HashedEdges {
    edges: FxHashMap<TokenId, NodeId>,
}

impl HashedEdges {
    /// Builds a hashed table from a linear one (for promotion).
    #[must_use]
    pub fn from_linear(linear: &LinearEdges) -> Self {
        Self {
            edges: linear.iter().collect(),
        }
    }
}

impl EdgeTable for HashedEdges {
    #[inline]
    fn get(&self, token: TokenId) -> Option<NodeId> {
        self.edges.get(&token).copied()
    }

    fn insert(&mut self, token: TokenId, target: NodeId) {
        self.edges.insert(token, target);
    }

    fn len(&self) -> usize {
        self.edges.len()
    }
}

/// A node's edges in whichever representation its fan-out calls for.
#[derive(Debug, Clone)]
pub enum EdgeMap {
    /// Low fan-out storage (array-based).
    Linear(LinearEdges),
    /// High fan-out storage (hash-based).
    Hashed(HashedEdges),
}

impl Default for EdgeMap {
    fn default() -> Self {
        Self::Linear(LinearEdges::new())
    }
}

impl EdgeMap {
    /// Returns true if this node uses hashed storage.
    #[must_use]
    pub fn is_hashed(&self) -> bool {
        matches!(self, Self::Hashed(_))
    }

    /// Promotes to hashed storage if currently linear.
    pub fn promote(&mut self) {
        if let Self::Linear(linear) = self {
            *self = Self::Hashed(HashedEdges::from_linear(linear));
        }
    }

    /// Inserts an edge, promoting once the fan-out exceeds `linear_limit`.
    ///
    /// Returns true if this insert triggered a promotion. There is no demotion.
    pub fn insert_with_limit(&mut self, token: TokenId, target: NodeId, linear_limit: usize) -> bool {
        self.insert(token, target);
        if !self.is_hashed() && self.len() > linear_limit {
            self.promote();
            return true;
        }
        false
    }
}

impl EdgeTable for EdgeMap {
    #[inline]
    fn get(&self, token: TokenId) -> Option<NodeId> {
        match self {
            Self::Linear(linear) => linear.get(token),
            Self::Hashed(hashed) => hashed.get(token),
        }
    }

    fn insert(&mut self, token: TokenId, target: NodeId) {
        match self {
            Self::Linear(linear) => linear.insert(token, target),
            Self::Hashed(hashed) => hashed.insert(token, target),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Linear(linear) => linear.len(),
            Self::Hashed(hashed) => hashed.len(),
        }
    }
}
