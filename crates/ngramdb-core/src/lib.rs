//! # `ngramdb` Core
//!
//! Incremental multi-pattern phrase matching engine.
//!
//! `ngramdb` keeps a growing set of multi-token patterns ("phrases") in a
//! concurrently mutable token trie and reports, for every document it is
//! asked about, each distinct pattern that occurs in it. Patterns carry a
//! temporal validity window, so a query only sees the patterns that were
//! live at its own timestamp.
//!
//! ## Features
//!
//! - **Token interning**: bucket-locked dictionary with dense `TokenId`s
//! - **Concurrent trie**: per-node locks, append-only node arena
//! - **Streaming matcher**: every start position tracked in one left-to-right pass
//! - **Batch pipeline**: buffered mutations, parallel matching, ordered output
//!
//! ## Quick Start
//!
//! ```rust
//! use ngramdb_core::{Engine, NgramConfig};
//!
//! let engine = Engine::new(NgramConfig::small())?;
//! engine.load_initial("hello world")?;
//! engine.load_initial("hello")?;
//!
//! assert_eq!(engine.query("hello world today", 1), "hello|hello world");
//! # Ok::<(), ngramdb_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Token and node ids are u32 by construction; bounds are checked where ids are minted.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]

pub mod automaton;
#[cfg(test)]
mod automaton_tests;
pub mod config;
pub mod dictionary;
pub mod edge_map;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod pattern_index;
pub mod pipeline;
pub mod stats;
pub mod sync;
pub mod temporal;
pub mod tokens;
pub mod types;
pub mod worker_pool;

pub use automaton::PatternAutomaton;
pub use config::{
    AutomatonConfig, ConfigError, DictionaryConfig, DuplicatePolicy, LoggingConfig, NgramConfig,
    PipelineConfig,
};
pub use dictionary::TokenDictionary;
pub use engine::Engine;
pub use error::{Error, Result};
pub use matcher::{render_matches, MatchVisitor, PatternMatch, NO_MATCH};
pub use pattern_index::PatternIndex;
pub use pipeline::{BatchPipeline, Operation};
pub use stats::{EngineStats, StatsSnapshot};
pub use temporal::{TemporalRecord, OPEN_END};
pub use types::{NodeId, Timestamp, TokenId};
pub use worker_pool::WorkerPool;
