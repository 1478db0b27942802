//! Error types for `ngramdb`.
//!
//! This module provides a unified error type for all engine operations.
//! Error codes follow the pattern `NGRAM-XXX` for easy grepping in logs.

use thiserror::Error;

/// Result type alias for `ngramdb` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `ngramdb` operations.
///
/// Unknown tokens during matching and deletes of unknown patterns are not
/// errors: they are ordinary "nothing matched" outcomes.
#[derive(Error, Debug)]
pub enum Error {
    /// The token dictionary reached its fixed capacity (NGRAM-001).
    ///
    /// Fatal: the dictionary is never resized at runtime.
    #[error("[NGRAM-001] Token dictionary is full: capacity of {capacity} tokens exhausted")]
    DictionaryFull {
        /// Configured maximum number of distinct tokens.
        capacity: usize,
    },

    /// The automaton node arena reached its fixed capacity (NGRAM-002).
    ///
    /// Fatal: the node arena is never resized at runtime.
    #[error("[NGRAM-002] Pattern automaton is full: capacity of {capacity} nodes exhausted")]
    AutomatonFull {
        /// Configured maximum number of trie nodes.
        capacity: usize,
    },

    /// A pattern without any token was submitted (NGRAM-003).
    #[error("[NGRAM-003] Pattern is empty")]
    EmptyPattern,

    /// Configuration error (NGRAM-004).
    #[error("[NGRAM-004] Configuration error: {0}")]
    Config(String),

    /// IO error (NGRAM-005).
    #[error("[NGRAM-005] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Worker pool failure (NGRAM-006).
    ///
    /// A worker thread could not be spawned or died while holding jobs.
    #[error("[NGRAM-006] Worker pool error: {0}")]
    WorkerPool(String),

    /// Internal error (NGRAM-007).
    ///
    /// Indicates a broken internal invariant. Please report if encountered.
    #[error("[NGRAM-007] Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code (e.g., "NGRAM-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DictionaryFull { .. } => "NGRAM-001",
            Self::AutomatonFull { .. } => "NGRAM-002",
            Self::EmptyPattern => "NGRAM-003",
            Self::Config(_) => "NGRAM-004",
            Self::Io(_) => "NGRAM-005",
            Self::WorkerPool(_) => "NGRAM-006",
            Self::Internal(_) => "NGRAM-007",
        }
    }

    /// Returns true if the process cannot continue after this error.
    ///
    /// Capacity exhaustion is fatal because neither the dictionary nor the
    /// node arena grows past its preallocated bound.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DictionaryFull { .. } | Self::AutomatonFull { .. } | Self::Internal(_)
        )
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
