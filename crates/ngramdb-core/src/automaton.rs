//! Concurrently mutable token trie carrying temporal records.
//!
//! # Layout
//!
//! - **Node arena**: nodes are addressed by dense [`NodeId`]s and live in a
//!   chunked, append-only arena. Chunks are allocated lazily and never move,
//!   so a `&Node` stays valid while writers keep appending. Nodes are never
//!   removed or merged, even when every pattern through them is deleted.
//! - **Root arc table**: the root's fan-out is the set of every pattern's
//!   first token, so its edges live in a dense table indexed by [`TokenId`]
//!   instead of an [`EdgeMap`]. Lookups are a single acquire load.
//! - **Inner nodes**: an [`EdgeMap`] behind a per-node `RwLock`, plus the
//!   node's temporal records behind a second per-node lock.
//!
//! # Lock Ordering
//!
//! A writer extending node `n` holds `n`'s edge lock (or the root lock) and
//! then takes the arena's grow lock to append the child. The grow lock is
//! never held while acquiring any node lock, so the order is always
//! node -> grow.

use std::sync::OnceLock;

use crate::config::{AutomatonConfig, DuplicatePolicy};
use crate::edge_map::{EdgeMap, EdgeTable};
use crate::error::{Error, Result};
use crate::sync::{AtomicU32, AtomicUsize, Mutex, Ordering, RwLock};
use crate::temporal::TemporalRecord;
use crate::types::{NodeId, Timestamp, TokenId};

const CHUNK_BITS: usize = 12;
const CHUNK_SIZE: usize = 1 << CHUNK_BITS;
const CHUNK_MASK: usize = CHUNK_SIZE - 1;

/// Root table slot value meaning "no edge".
const NO_EDGE: u32 = u32::MAX;

/// Fixed directory of lazily allocated, never-moving chunks.
#[derive(Debug)]
struct Chunked<T> {
    chunks: Box<[OnceLock<Box<[T]>>]>,
}

impl<T: Default> Chunked<T> {
    fn with_capacity(capacity: usize) -> Self {
        let chunk_count = capacity.div_ceil(CHUNK_SIZE);
        Self {
            chunks: (0..chunk_count).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Returns the slot if its chunk has been allocated.
    #[inline]
    fn get(&self, index: usize) -> Option<&T> {
        self.chunks
            .get(index >> CHUNK_BITS)?
            .get()?
            .get(index & CHUNK_MASK)
    }

    /// Returns the slot, allocating its chunk on first use.
    fn get_or_init(&self, index: usize) -> Option<&T> {
        self.chunks
            .get(index >> CHUNK_BITS)?
            .get_or_init(|| (0..CHUNK_SIZE).map(|_| T::default()).collect())
            .get(index & CHUNK_MASK)
    }
}

/// One root arc: the child node id, or [`NO_EDGE`].
#[derive(Debug)]
struct RootSlot(AtomicU32);

impl Default for RootSlot {
    fn default() -> Self {
        Self(AtomicU32::new(NO_EDGE))
    }
}

/// A trie node. Terminal iff it carries at least one temporal record.
#[derive(Debug, Default)]
pub struct Node {
    edges: RwLock<EdgeMap>,
    records: RwLock<Vec<TemporalRecord>>,
}

impl Node {
    /// Returns the child reached by `token`.
    #[inline]
    pub fn edge(&self, token: TokenId) -> Option<NodeId> {
        self.edges.read().get(token)
    }

    /// Returns the pattern byte length if any record is active at `t`.
    #[inline]
    pub fn active_length(&self, t: Timestamp) -> Option<u32> {
        self.records
            .read()
            .iter()
            .find(|record| record.is_active(t))
            .map(TemporalRecord::length)
    }

    /// Returns true if at least one pattern ends here.
    pub fn is_terminal(&self) -> bool {
        !self.records.read().is_empty()
    }

    /// Returns the number of temporal records attached to this node.
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Returns the number of outgoing edges.
    pub fn fan_out(&self) -> usize {
        self.edges.read().len()
    }

    /// Returns true if this node's edges were promoted to a hash map.
    pub fn has_hashed_edges(&self) -> bool {
        self.edges.read().is_hashed()
    }
}

/// Token trie over interned token ids with per-node locking.
#[derive(Debug)]
pub struct PatternAutomaton {
    nodes: Chunked<Node>,
    /// Published node count; ids below it are initialized.
    len: AtomicUsize,
    grow_lock: Mutex<()>,
    max_nodes: usize,
    root_edges: Chunked<RootSlot>,
    root_lock: Mutex<()>,
    linear_edge_limit: usize,
    policy: DuplicatePolicy,
    promotions: AtomicUsize,
}

impl PatternAutomaton {
    /// Creates an automaton holding only the root.
    ///
    /// `max_tokens` sizes the root arc table and must match the dictionary's
    /// capacity so every interned id has a slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AutomatonFull`] if `config.max_nodes` cannot hold the root.
    pub fn new(config: &AutomatonConfig, max_tokens: usize) -> Result<Self> {
        let automaton = Self {
            nodes: Chunked::with_capacity(config.max_nodes),
            len: AtomicUsize::new(0),
            grow_lock: Mutex::new(()),
            max_nodes: config.max_nodes,
            root_edges: Chunked::with_capacity(max_tokens),
            root_lock: Mutex::new(()),
            linear_edge_limit: config.linear_edge_limit.max(1),
            policy: config.duplicate_policy,
            promotions: AtomicUsize::new(0),
        };
        let root = automaton.allocate_node()?;
        debug_assert!(root.is_root());
        Ok(automaton)
    }

    fn allocate_node(&self) -> Result<NodeId> {
        let _guard = self.grow_lock.lock();
        let index = self.len.load(Ordering::Relaxed);
        if index >= self.max_nodes {
            tracing::error!(capacity = self.max_nodes, "automaton node arena exhausted");
            return Err(Error::AutomatonFull {
                capacity: self.max_nodes,
            });
        }
        self.nodes
            .get_or_init(index)
            .ok_or_else(|| Error::Internal(format!("node {index} outside arena directory")))?;
        self.len.store(index + 1, Ordering::Release);
        Ok(NodeId(index as u32))
    }

    /// Returns the node with the given id, if it has been published.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.index() >= self.len.load(Ordering::Acquire) {
            return None;
        }
        self.nodes.get(id.index())
    }

    #[inline]
    fn root_edge(&self, token: TokenId) -> Option<NodeId> {
        let target = self.root_edges.get(token.index())?.0.load(Ordering::Acquire);
        (target != NO_EDGE).then_some(NodeId(target))
    }

    /// Follows the edge labeled `token` out of `from`.
    #[inline]
    pub fn step(&self, from: NodeId, token: TokenId) -> Option<NodeId> {
        if from.is_root() {
            self.root_edge(token)
        } else {
            self.node(from)?.edge(token)
        }
    }

    /// Returns the pattern length at `node` if one of its records is active at `t`.
    #[inline]
    pub fn active_length(&self, node: NodeId, t: Timestamp) -> Option<u32> {
        self.node(node)?.active_length(t)
    }

    fn child_or_insert(&self, parent: NodeId, token: TokenId) -> Result<NodeId> {
        if parent.is_root() {
            return self.root_child_or_insert(token);
        }

        let node = self
            .node(parent)
            .ok_or_else(|| Error::Internal(format!("unpublished parent node {}", parent.0)))?;

        if let Some(child) = node.edges.read().get(token) {
            return Ok(child);
        }

        let mut edges = node.edges.write();
        if let Some(child) = edges.get(token) {
            return Ok(child);
        }
        let child = self.allocate_node()?;
        if edges.insert_with_limit(token, child, self.linear_edge_limit) {
            self.promotions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(node = parent.0, fan_out = edges.len(), "edge map promoted to hash");
        }
        Ok(child)
    }

    fn root_child_or_insert(&self, token: TokenId) -> Result<NodeId> {
        if let Some(child) = self.root_edge(token) {
            return Ok(child);
        }

        let _guard = self.root_lock.lock();
        if let Some(child) = self.root_edge(token) {
            return Ok(child);
        }
        let slot = self.root_edges.get_or_init(token.index()).ok_or_else(|| {
            Error::Internal(format!("token {} outside root arc table", token.0))
        })?;
        let child = self.allocate_node()?;
        slot.0.store(child.0, Ordering::Release);
        Ok(child)
    }

    /// Walks the trie along `tokens` without inserting anything.
    pub fn find_path(&self, tokens: &[TokenId]) -> Option<NodeId> {
        if tokens.is_empty() {
            return None;
        }
        tokens
            .iter()
            .try_fold(NodeId::ROOT, |node, &token| self.step(node, token))
    }

    /// Inserts a pattern and attaches an open record `[valid_from, +inf)`.
    ///
    /// Existing prefixes are reused; missing nodes are appended under the
    /// lock of the node being extended. Under [`DuplicatePolicy::Independent`]
    /// re-adding a pattern adds another record to the same terminal; under
    /// [`DuplicatePolicy::Overwrite`] the node keeps one open record, and the
    /// previous one is closed at `valid_from` so earlier timestamps still
    /// see it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPattern`] for an empty token sequence and
    /// [`Error::AutomatonFull`] once the node arena is exhausted.
    pub fn add_pattern(
        &self,
        tokens: &[TokenId],
        valid_from: Timestamp,
        length: u32,
    ) -> Result<NodeId> {
        if tokens.is_empty() {
            return Err(Error::EmptyPattern);
        }

        let mut current = NodeId::ROOT;
        for &token in tokens {
            current = self.child_or_insert(current, token)?;
        }

        let node = self
            .node(current)
            .ok_or_else(|| Error::Internal(format!("unpublished terminal node {}", current.0)))?;
        let mut records = node.records.write();
        match self.policy {
            DuplicatePolicy::Independent => records.push(TemporalRecord::new(valid_from, length)),
            DuplicatePolicy::Overwrite => overwrite_open_record(&mut records, valid_from, length),
        }
        Ok(current)
    }

    /// Ends the pattern instance of `node` at `t`.
    ///
    /// Under [`DuplicatePolicy::Independent`] this closes the oldest open
    /// record whose window starts before `t`. Under
    /// [`DuplicatePolicy::Overwrite`] it ends whichever record is active at
    /// `t`, including one already closed later by an eager re-add.
    ///
    /// Returns false if nothing was closed (unknown node, no matching record).
    /// Safe to call while readers evaluate the same records.
    pub fn deactivate(&self, node: NodeId, t: Timestamp) -> bool {
        if node.is_root() {
            return false;
        }
        let Some(node) = self.node(node) else {
            return false;
        };
        let records = node.records.read();
        match self.policy {
            DuplicatePolicy::Independent => records.iter().any(|record| record.close(t)),
            DuplicatePolicy::Overwrite => records.iter().any(|record| record.truncate(t)),
        }
    }

    /// Returns the number of published nodes, root included.
    pub fn node_count(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns the fixed node capacity.
    pub fn capacity(&self) -> usize {
        self.max_nodes
    }

    /// Returns the configured duplicate policy.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Returns how many nodes switched from linear to hashed edges.
    pub fn promotion_count(&self) -> usize {
        self.promotions.load(Ordering::Relaxed)
    }
}

/// Replaces the open record of an overwrite-policy node, keeping history.
///
/// The current open record is closed at `valid_from`. A re-add at the same
/// timestamp is a no-op. A re-add older than the open record gets a window
/// ending where the open one starts, so the node never holds two open
/// records.
fn overwrite_open_record(records: &mut Vec<TemporalRecord>, valid_from: Timestamp, length: u32) {
    let record = TemporalRecord::new(valid_from, length);
    if let Some(open) = records.iter().find(|record| record.is_open()) {
        if open.valid_from() == valid_from {
            return;
        }
        if open.valid_from() < valid_from {
            open.close(valid_from);
        } else {
            record.close(open.valid_from());
        }
    }
    records.push(record);
}
