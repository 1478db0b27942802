//! Engine facade: dictionary, automaton and exact-pattern index behind one handle.
//!
//! [`Engine`] is the synchronous API. Each call is applied immediately, which
//! is what tests and embedders want; the batched, parallel path lives in
//! [`crate::pipeline::BatchPipeline`], which drives the same shared state.

use std::sync::Arc;

use crate::automaton::PatternAutomaton;
use crate::config::NgramConfig;
use crate::dictionary::TokenDictionary;
use crate::error::{Error, Result};
use crate::matcher::{render_matches, MatchVisitor};
use crate::pattern_index::PatternIndex;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::tokens::split_tokens;
use crate::types::{NodeId, Timestamp};

/// Timestamp given to patterns loaded before the operation stream.
pub const INITIAL_TIMESTAMP: Timestamp = 0;

/// State shared between the driving thread and matching workers.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) dictionary: TokenDictionary,
    pub(crate) automaton: PatternAutomaton,
    pub(crate) index: PatternIndex,
    pub(crate) stats: EngineStats,
}

impl Shared {
    fn insert(&self, text: &str, valid_from: Timestamp, initial: bool) -> Result<NodeId> {
        if text.is_empty() {
            return Err(Error::EmptyPattern);
        }
        let length = u32::try_from(text.len())
            .map_err(|_| Error::Internal(format!("pattern of {} bytes", text.len())))?;

        let tokens = split_tokens(text)
            .map(|(_, token)| self.dictionary.intern(token))
            .collect::<Result<Vec<_>>>()?;
        let node = self.automaton.add_pattern(&tokens, valid_from, length)?;
        self.index.insert_first(text, node);
        self.stats.record_pattern(initial, text.len());
        Ok(node)
    }

    pub(crate) fn add(&self, text: &str, timestamp: Timestamp) -> Result<NodeId> {
        self.insert(text, timestamp, false)
    }

    pub(crate) fn delete(&self, text: &str, timestamp: Timestamp) -> bool {
        let closed = self
            .index
            .get(text)
            .is_some_and(|node| self.automaton.deactivate(node, timestamp));
        if !closed {
            tracing::trace!(pattern = text, timestamp, "delete matched no open pattern");
        }
        self.stats.record_deletion(closed);
        closed
    }

    pub(crate) fn query_with(
        &self,
        visitor: &mut MatchVisitor,
        document: &str,
        timestamp: Timestamp,
    ) -> String {
        let matches = visitor.scan(&self.automaton, &self.dictionary, document, timestamp);
        let found = matches.len();
        let line = render_matches(document, matches);
        self.stats.record_query(document.len(), found);
        line
    }
}

/// Pattern matching engine.
///
/// Cheap to clone: clones share the same patterns.
#[derive(Debug, Clone)]
pub struct Engine {
    shared: Arc<Shared>,
    config: NgramConfig,
}

impl Engine {
    /// Builds an empty engine sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration does not validate.
    pub fn new(config: NgramConfig) -> Result<Self> {
        config.validate()?;

        let dictionary =
            TokenDictionary::new(config.dictionary.bucket_count, config.dictionary.max_tokens);
        let automaton =
            PatternAutomaton::new(&config.automaton, config.dictionary.max_tokens)?;

        tracing::info!(
            buckets = dictionary.bucket_count(),
            max_tokens = dictionary.capacity(),
            max_nodes = automaton.capacity(),
            policy = ?automaton.policy(),
            workers = config.effective_workers(),
            "engine initialized"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                dictionary,
                automaton,
                index: PatternIndex::new(),
                stats: EngineStats::default(),
            }),
            config,
        })
    }

    /// Loads a pattern that is active from the start of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPattern`] for empty text, or a fatal capacity error.
    pub fn load_initial(&self, text: &str) -> Result<NodeId> {
        self.shared.insert(text, INITIAL_TIMESTAMP, true)
    }

    /// Adds a pattern active from `timestamp` on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPattern`] for empty text, or a fatal capacity error.
    pub fn add(&self, text: &str, timestamp: Timestamp) -> Result<NodeId> {
        self.shared.add(text, timestamp)
    }

    /// Ends the validity of `text` at `timestamp`.
    ///
    /// Returns false if no open instance of the pattern started before
    /// `timestamp`. That is not an error.
    pub fn delete(&self, text: &str, timestamp: Timestamp) -> bool {
        self.shared.delete(text, timestamp)
    }

    /// Matches one document against the patterns active at `timestamp`.
    ///
    /// Returns the result line: matched substrings joined by `|`, or `-1`.
    pub fn query(&self, document: &str, timestamp: Timestamp) -> String {
        let mut visitor = MatchVisitor::new();
        self.shared.query_with(&mut visitor, document, timestamp)
    }

    /// Returns the configuration the engine was built with.
    pub fn config(&self) -> &NgramConfig {
        &self.config
    }

    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Returns the number of distinct tokens interned so far.
    pub fn token_count(&self) -> usize {
        self.shared.dictionary.len()
    }

    /// Returns the number of trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.shared.automaton.node_count()
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}
