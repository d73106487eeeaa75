use std::collections::BTreeMap;

use rand::Rng;

use serde::{Deserialize, Serialize};


/// Attributes of one observed (first, second, result) triple.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Continuation {
	/// How many times this exact triple was observed in training data.
	pub frequency: u64,
	/// True if `first` opened a sentence in at least one observed occurrence.
	pub sentence_start: bool,
}

/// All observed continuations of a fixed two-word context.
///
/// A `ContextState` corresponds to one (first, second) word pair and stores
/// every result word that was seen to follow it, with occurrence counts.
///
/// Conceptually, this is a node in a second-order Markov chain where
/// outgoing edges are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate continuation occurrences during ingestion
/// - Pick the next word using weighted random sampling
/// - Merge with another state for the same context (parallel training support)
///
/// ## Invariants
/// - All continuations belong to the same (first, second) pair
/// - Each continuation frequency is strictly positive
/// - Continuations are kept in a `BTreeMap` so iteration order is stable
///   and a seeded RNG reproduces the same draws
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContextState {
	/// First word of the context pair.
	first: String,
	/// Second word of the context pair.
	second: String,
	/// Outgoing continuations indexed by the result word.
	/// Example: { "world" => Continuation { frequency: 42, .. } }
	continuations: BTreeMap<String, Continuation>,
}

impl ContextState {
	/// Creates a new empty state for the given context pair.
	pub fn new(first: &str, second: &str) -> Self {
		Self {
			first: first.to_owned(),
			second: second.to_owned(),
			continuations: BTreeMap::new(),
		}
	}

	/// First word of the context pair.
	pub fn first(&self) -> &str {
		&self.first
	}

	/// Second word of the context pair.
	pub fn second(&self) -> &str {
		&self.second
	}

	/// Records an occurrence of a continuation toward `result`.
	///
	/// - If the continuation already exists, its frequency is increased and
	///   its sentence-start flag is OR-ed with `sentence_start`.
	/// - Otherwise, a new continuation is created with frequency 1.
	pub fn record(&mut self, result: &str, sentence_start: bool) {
		let continuation = self.continuations.entry(result.to_owned()).or_default();
		continuation.frequency += 1;
		continuation.sentence_start |= sentence_start;
	}

	/// Returns the stored attributes of the continuation toward `result`,
	/// or `None` if that triple was never observed.
	pub fn continuation(&self, result: &str) -> Option<&Continuation> {
		self.continuations.get(result)
	}

	/// Iterates over all continuations as `(result_word, attributes)` pairs.
	pub fn continuations(&self) -> impl Iterator<Item = (&str, &Continuation)> {
		self.continuations.iter().map(|(result, c)| (result.as_str(), c))
	}

	/// Number of distinct continuations recorded for this context.
	pub fn len(&self) -> usize {
		self.continuations.len()
	}

	/// True if no continuation has been recorded yet.
	pub fn is_empty(&self) -> bool {
		self.continuations.is_empty()
	}

	/// Picks the next word using weighted random sampling.
	///
	/// The probability of selecting a word is proportional to its
	/// occurrence frequency, over all continuations of this context
	/// regardless of their sentence-start flag.
	///
	/// This method performs:
	/// - an O(n) scan over the continuations
	/// - a cumulative subtraction to select a bucket
	///
	/// The scan always leaves the last candidate selectable, so a draw
	/// can never fall through without a result.
	///
	/// Returns `None` if the state has no continuations.
	pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<&str> {
		if self.continuations.is_empty() {
			return None;
		}

		// Compute the total number of occurrences
		let total: u64 = self.continuations.values().map(|c| c.frequency).sum();
		if total == 0 {
			// Should not happen due to invariants, but kept for safety
			return None;
		}

		// Randomly select a word
		let mut r = rng.random_range(0..total);

		let mut fallback: Option<&str> = None;
		for (result, continuation) in &self.continuations {
			if r < continuation.frequency {
				return Some(result.as_str());
			}
			r -= continuation.frequency;
			fallback = Some(result.as_str());
		}

		// Last candidate, reachable only if the counts were undercounted.
		fallback
	}

	/// Merges another state into this one.
	///
	/// Both states must represent the same (first, second) context; the
	/// store merges by key, so this holds whenever the invariants do.
	/// Frequencies are summed and sentence-start flags are OR-ed.
	///
	/// This method is intended for parallel training, where multiple
	/// partial stores are combined into a single one.
	pub fn merge(&mut self, other: &Self) {
		debug_assert!(self.first == other.first && self.second == other.second);

		for (result, theirs) in &other.continuations {
			let ours = self.continuations.entry(result.clone()).or_default();
			ours.frequency += theirs.frequency;
			ours.sentence_start |= theirs.sentence_start;
		}
	}
}
