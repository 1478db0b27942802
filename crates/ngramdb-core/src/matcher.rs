//! Streaming multi-position matcher.
//!
//! A [`MatchVisitor`] is fed a document one token at a time. It keeps the set
//! of walks in progress (trie nodes reached by some suffix of the document
//! read so far) in two alternating buffers. Each token:
//!
//! 1. tries the root edge, starting a new walk at this token,
//! 2. advances every walk in progress, dropping those with no edge,
//! 3. reports every reached node whose record is active at the query time.
//!
//! Work per token is proportional to the number of live walks plus one, never
//! to the number of stored patterns. A token unknown to the dictionary kills
//! every walk, since no pattern contains it.

use rustc_hash::FxHashSet;

use crate::automaton::PatternAutomaton;
use crate::dictionary::TokenDictionary;
use crate::tokens::split_tokens;
use crate::types::{NodeId, Timestamp, TokenId};

/// Result line of a query that matched nothing.
pub const NO_MATCH: &str = "-1";

/// Separator between matched substrings in a result line.
pub const RESULT_SEPARATOR: char = '|';

/// One occurrence of an active pattern in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternMatch {
    /// Byte offset where the pattern starts.
    pub start: usize,
    /// Byte length of the pattern.
    pub len: usize,
    /// Terminal node that produced the match.
    pub node: NodeId,
}

impl PatternMatch {
    /// Returns the matched substring of `document`.
    #[must_use]
    pub fn text<'a>(&self, document: &'a str) -> Option<&'a str> {
        document.get(self.start..self.start + self.len)
    }
}

/// Per-document matching state with double-buffered walk sets.
#[derive(Debug, Default)]
pub struct MatchVisitor {
    walks: [Vec<NodeId>; 2],
    current: usize,
}

impl MatchVisitor {
    /// Creates an empty visitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every walk in progress, keeping buffer capacity.
    pub fn reset(&mut self) {
        self.walks[0].clear();
        self.walks[1].clear();
    }

    /// Walks that survived the last token.
    #[must_use]
    pub fn active_walks(&self) -> &[NodeId] {
        &self.walks[self.current]
    }

    /// Advances all walks by one document token.
    ///
    /// `token` is `None` for a token the dictionary has never seen. `end` is
    /// the byte offset just past the token; match starts are derived from it
    /// and the terminal's recorded pattern length.
    pub fn feed(
        &mut self,
        automaton: &PatternAutomaton,
        token: Option<TokenId>,
        end: usize,
        timestamp: Timestamp,
        out: &mut Vec<PatternMatch>,
    ) {
        let Some(token) = token else {
            self.reset();
            return;
        };

        let [first, second] = &mut self.walks;
        let (current, next) = if self.current == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        };
        next.clear();

        advance(automaton, NodeId::ROOT, token, end, timestamp, next, out);
        for &node in current {
            advance(automaton, node, token, end, timestamp, next, out);
        }

        self.current = 1 - self.current;
    }

    /// Runs the whole document through the automaton.
    ///
    /// Returns every match, deduplicated by terminal node (earliest
    /// occurrence kept), in the order matches completed.
    pub fn scan(
        &mut self,
        automaton: &PatternAutomaton,
        dictionary: &TokenDictionary,
        document: &str,
        timestamp: Timestamp,
    ) -> Vec<PatternMatch> {
        self.reset();
        let mut matches = Vec::new();
        for (offset, token) in split_tokens(document) {
            let id = dictionary.lookup(token);
            self.feed(automaton, id, offset + token.len(), timestamp, &mut matches);
        }

        let mut seen = FxHashSet::default();
        matches.retain(|m| seen.insert(m.node));
        matches
    }
}

#[inline]
fn advance(
    automaton: &PatternAutomaton,
    from: NodeId,
    token: TokenId,
    end: usize,
    timestamp: Timestamp,
    next: &mut Vec<NodeId>,
    out: &mut Vec<PatternMatch>,
) {
    let Some(child) = automaton.step(from, token) else {
        return;
    };
    next.push(child);

    if let Some(len) = automaton.active_length(child, timestamp) {
        let len = len as usize;
        if let Some(start) = end.checked_sub(len) {
            out.push(PatternMatch {
                start,
                len,
                node: child,
            });
        }
    }
}

/// Formats a query result line.
///
/// Matches are ordered by `(start, len)`, a substring is listed once even if
/// it occurs several times, and entries are joined with `|`. No match yields
/// [`NO_MATCH`].
#[must_use]
pub fn render_matches(document: &str, mut matches: Vec<PatternMatch>) -> String {
    matches.sort_unstable_by_key(|m| (m.start, m.len));

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut line = String::new();
    for text in matches.iter().filter_map(|m| m.text(document)) {
        if !seen.insert(text) {
            continue;
        }
        if !line.is_empty() {
            line.push(RESULT_SEPARATOR);
        }
        line.push_str(text);
    }

    if line.is_empty() {
        NO_MATCH.to_string()
    } else {
        line
    }
}
