//! Word-transition text generation library.
//!
//! This crate provides the statistical core of a posting bot:
//! - A second-order Markov model over words with persisted counts
//! - Batch-atomic corpus ingestion with sentence-start tracking
//! - Weighted sentence sampling with safety bounds
//! - Compact binary model persistence
//!
//! Only the high-level API is exposed publicly. Low-level I/O helpers
//! are kept internal to ensure consistency and prevent misuse.

/// Error taxonomy shared by the store and the generator.
pub mod error;

/// Core transition model and generation logic.
pub mod model;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;
