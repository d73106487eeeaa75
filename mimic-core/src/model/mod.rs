//! Top-level module for the transition-model system.
//!
//! This crate provides a second-order Markov word model, including:
//! - The persisted transition store (`TransitionStore`)
//! - Sentence sampling (`SentenceGenerator`)
//! - Internal transition records (`ContextState`, `Continuation`)

/// Sentence generation by walking the transition store.
///
/// Exposes seed selection, weighted continuation sampling, and the
/// abandoned-walk outcome with a configurable length bound.
pub mod generator;

/// The transition store: ingestion, sampling, merging, persistence.
///
/// Supports batch-atomic token ingestion, parallel corpus training,
/// and compact binary serialization.
pub mod store;

/// Per-context transition records.
///
/// Tracks continuation frequencies and sentence-start flags, and
/// supports weighted random sampling.
pub mod transition;
