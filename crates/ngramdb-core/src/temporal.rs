//! Temporal records: the `[valid_from, valid_to)` window of one pattern instance.
//!
//! `valid_to` is the only field mutated after construction. It is published
//! with release ordering and read with acquire ordering, so a reader racing a
//! Delete observes either the open window or the closed one, never a torn
//! value.

use crate::sync::{AtomicU64, Ordering};
use crate::types::Timestamp;

/// `valid_to` of a pattern that has not been deleted.
pub const OPEN_END: Timestamp = Timestamp::MAX;

/// Activation window and byte length of one stored pattern instance.
#[derive(Debug)]
pub struct TemporalRecord {
    valid_from: Timestamp,
    valid_to: AtomicU64,
    length: u32,
}

impl TemporalRecord {
    /// Creates an open record `[valid_from, +inf)` for a pattern of `length` bytes.
    #[must_use]
    pub fn new(valid_from: Timestamp, length: u32) -> Self {
        Self {
            valid_from,
            valid_to: AtomicU64::new(OPEN_END),
            length,
        }
    }

    /// Timestamp of the Add that created this instance.
    #[inline]
    #[must_use]
    pub fn valid_from(&self) -> Timestamp {
        self.valid_from
    }

    /// Timestamp of the Delete that closed this instance, or [`OPEN_END`].
    #[inline]
    #[must_use]
    pub fn valid_to(&self) -> Timestamp {
        self.valid_to.load(Ordering::Acquire)
    }

    /// Byte length of the pattern text.
    #[inline]
    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Returns true while no Delete has closed this instance.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.valid_to() == OPEN_END
    }

    /// Returns true iff `valid_from <= t < valid_to`.
    #[inline]
    #[must_use]
    pub fn is_active(&self, t: Timestamp) -> bool {
        self.valid_from <= t && t < self.valid_to()
    }

    /// Closes the window at `t`.
    ///
    /// Only an open record whose `valid_from < t` can be closed, which keeps
    /// `valid_from < valid_to`. Returns false if the record was already
    /// closed (possibly by a racing Delete) or `t` is not after `valid_from`.
    pub fn close(&self, t: Timestamp) -> bool {
        if t <= self.valid_from || t == OPEN_END {
            return false;
        }
        self.valid_to
            .compare_exchange(OPEN_END, t, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Ends the window at `t` if the record is active at `t`.
    ///
    /// Unlike [`close`](Self::close) this also shortens a window that was
    /// already closed at a later timestamp. Returns false if `t` is outside
    /// `(valid_from, valid_to)`.
    pub fn truncate(&self, t: Timestamp) -> bool {
        if t <= self.valid_from {
            return false;
        }
        let mut current = self.valid_to.load(Ordering::Acquire);
        while t < current {
            match self
                .valid_to
                .compare_exchange(current, t, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }
}
