//! Synchronization primitives with loom support for concurrency testing.
//!
//! Atomics switch to loom's mocked versions under `cfg(loom)` so the temporal
//! record publication protocol can be model checked. Locks always come from
//! `parking_lot`: loom's lock API returns `LockResult` and the per-node lock
//! discipline is covered by the stress tests instead.
//!
//! # Testing with Loom
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --features loom --test loom_tests --release
//! ```

// ============================================================================
// Locks
// ============================================================================

pub use parking_lot::{Mutex, RwLock};

// ============================================================================
// Atomics
// ============================================================================

#[cfg(loom)]
pub use loom::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

#[cfg(not(loom))]
pub use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
