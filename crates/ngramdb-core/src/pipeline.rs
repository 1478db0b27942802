//! Batch pipeline: buffered mutations, parallel matching, ordered output.
//!
//! Operations arrive one at a time from the line source. Deletes (and adds,
//! when `pipeline.defer_adds` is set) are queued; queries are buffered. On
//! [`Operation::Flush`] the pipeline:
//!
//! 1. applies queued mutations sequentially, in submission order,
//! 2. hands the buffered queries to the worker pool in chunks of
//!    `pipeline.queries_per_job`,
//! 3. waits for exactly one result per query,
//! 4. returns the result lines in submission order.
//!
//! Each query is evaluated at its own timestamp, so a delete submitted after a
//! query in the same batch does not hide the pattern from that query.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::unbounded;

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::matcher::MatchVisitor;
use crate::types::Timestamp;
use crate::worker_pool::WorkerPool;

/// One classified record from the line source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Pattern from the bulk load preceding the operation stream.
    InitialPattern(String),
    /// Pattern that becomes active at `timestamp`.
    Add {
        /// Pattern text.
        text: String,
        /// Operation timestamp.
        timestamp: Timestamp,
    },
    /// Pattern whose validity ends at `timestamp`.
    Delete {
        /// Pattern text.
        text: String,
        /// Operation timestamp.
        timestamp: Timestamp,
    },
    /// Document to match against the patterns active at `timestamp`.
    Query {
        /// Document text.
        document: String,
        /// Operation timestamp.
        timestamp: Timestamp,
    },
    /// Batch boundary: apply, match, emit.
    Flush,
}

#[derive(Debug)]
enum Mutation {
    Add { text: String, timestamp: Timestamp },
    Delete { text: String, timestamp: Timestamp },
}

/// Drives an [`Engine`] from a stream of [`Operation`]s.
#[derive(Debug)]
pub struct BatchPipeline {
    engine: Engine,
    pool: WorkerPool,
    mutations: Vec<Mutation>,
    queries: Vec<(String, Timestamp)>,
}

impl BatchPipeline {
    /// Starts the worker pool sized by the engine's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPool`] if worker threads cannot be spawned.
    pub fn new(engine: Engine) -> Result<Self> {
        let pool = WorkerPool::new(engine.config().effective_workers())?;
        Ok(Self {
            engine,
            pool,
            mutations: Vec::new(),
            queries: Vec::new(),
        })
    }

    /// Returns the engine this pipeline feeds.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns the number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Returns the number of queries waiting for the next flush.
    pub fn pending_queries(&self) -> usize {
        self.queries.len()
    }

    /// Accepts one operation.
    ///
    /// Returns the ordered result lines when `op` is [`Operation::Flush`],
    /// `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPattern`] for an add without text (the pipeline
    /// stays usable), or any fatal error raised while applying mutations.
    pub fn submit(&mut self, op: Operation) -> Result<Option<Vec<String>>> {
        match op {
            Operation::InitialPattern(text) => {
                self.engine.load_initial(&text)?;
            }
            Operation::Add { text, timestamp } => {
                if text.is_empty() {
                    return Err(Error::EmptyPattern);
                }
                if self.engine.config().pipeline.defer_adds {
                    self.mutations.push(Mutation::Add { text, timestamp });
                } else {
                    self.engine.add(&text, timestamp)?;
                }
            }
            Operation::Delete { text, timestamp } => {
                self.mutations.push(Mutation::Delete { text, timestamp });
            }
            Operation::Query {
                document,
                timestamp,
            } => {
                self.queries.push((document, timestamp));
            }
            Operation::Flush => return self.flush().map(Some),
        }
        Ok(None)
    }

    /// Applies queued mutations and matches every buffered query.
    ///
    /// # Errors
    ///
    /// Returns a fatal error from a mutation, or [`Error::WorkerPool`] if a
    /// worker died before reporting its results.
    pub fn flush(&mut self) -> Result<Vec<String>> {
        let started = Instant::now();
        let applied = self.mutations.len();

        let shared = self.engine.shared();
        for mutation in self.mutations.drain(..) {
            match mutation {
                Mutation::Add { text, timestamp } => {
                    shared.add(&text, timestamp)?;
                }
                Mutation::Delete { text, timestamp } => {
                    shared.delete(&text, timestamp);
                }
            }
        }

        let lines = self.match_queries()?;
        tracing::debug!(
            mutations = applied,
            queries = lines.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "batch flushed"
        );
        Ok(lines)
    }

    /// Flushes whatever is still buffered at end of input.
    ///
    /// # Errors
    ///
    /// Same as [`BatchPipeline::flush`].
    pub fn finish(&mut self) -> Result<Vec<String>> {
        if self.mutations.is_empty() && self.queries.is_empty() {
            return Ok(Vec::new());
        }
        self.flush()
    }

    fn match_queries(&mut self) -> Result<Vec<String>> {
        let total = self.queries.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let queries = Arc::new(std::mem::take(&mut self.queries));
        let per_job = self.engine.config().pipeline.queries_per_job.max(1);
        let (tx, rx) = unbounded::<(usize, String)>();

        for first in (0..total).step_by(per_job) {
            let last = (first + per_job).min(total);
            let queries = Arc::clone(&queries);
            let shared = Arc::clone(self.engine.shared());
            let tx = tx.clone();
            self.pool.execute(Box::new(move || {
                let mut visitor = MatchVisitor::new();
                for (offset, (document, timestamp)) in queries[first..last].iter().enumerate() {
                    let line = shared.query_with(&mut visitor, document, *timestamp);
                    if tx.send((first + offset, line)).is_err() {
                        return;
                    }
                }
            }))?;
        }
        drop(tx);

        let mut lines: Vec<Option<String>> = vec![None; total];
        for _ in 0..total {
            let (index, line) = rx.recv().map_err(|_| {
                Error::WorkerPool("worker exited before reporting its queries".to_string())
            })?;
            lines[index] = Some(line);
        }

        lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                line.ok_or_else(|| Error::Internal(format!("query {index} produced no result")))
            })
            .collect()
    }
}
