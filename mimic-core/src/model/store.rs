use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use rand::Rng;
use rand::prelude::IteratorRandom;

use serde::{Deserialize, Serialize};

use super::transition::{ContextState, Continuation};
use crate::error::ModelError;
use crate::io::{build_output_path, read_file};

/// Characters that mark a token as a sentence end, unless overridden.
pub const DEFAULT_SENTENCE_ENDS: &str = ".?!";

/// Durable mapping from a (first, second) word pair to the distribution of
/// words observed to follow it.
///
/// The store is the single owner of all transition records. Ingestion
/// slides a 3-word window over a token stream and accumulates counts;
/// generation queries the store through the sampling methods.
///
/// # Responsibilities
/// - Accumulate transition counts from token streams, one batch at a time
/// - Sample sentence-start pairs and weighted continuations
/// - Merge with other stores (parallel training support)
/// - Persist to and load from compact binary files
///
/// # Invariants
/// - Every stored triple was observed at least once (`frequency >= 1`)
/// - A triple's sentence-start flag is true iff its first word opened a
///   sentence in some observed occurrence
/// - An ingestion batch is committed whole or not at all
/// - Contexts are kept in a `BTreeMap` so seeded sampling is reproducible
#[derive(Serialize, Deserialize, Debug)]
pub struct TransitionStore {
	/// Characters whose presence anywhere in a token marks a sentence end.
	sentence_ends: String,
	/// Context states keyed by the (first, second) word pair.
	contexts: BTreeMap<(String, String), ContextState>,
}

impl TransitionStore {
	/// Creates an empty store with the default sentence-end set (`.?!`).
	pub fn new() -> Self {
		Self::with_sentence_ends(DEFAULT_SENTENCE_ENDS)
	}

	/// Creates an empty store with a custom sentence-end character set.
	pub fn with_sentence_ends(sentence_ends: &str) -> Self {
		Self {
			sentence_ends: sentence_ends.to_owned(),
			contexts: BTreeMap::new(),
		}
	}

	/// Loads a store from a binary model file if one exists next to
	/// `corpus_path`, otherwise trains from the corpus text and writes the
	/// binary for fast loading next time.
	///
	/// The binary path is the corpus path with a `bin` extension
	/// (`data/posts.txt` -> `data/posts.bin`).
	///
	/// # Errors
	/// Fails on file I/O or codec errors, or with `InputTooShort` when the
	/// corpus holds fewer than 3 tokens.
	pub fn open<P: AsRef<Path>>(corpus_path: P) -> Result<Self, ModelError> {
		let binary_path = build_output_path(&corpus_path, "bin")?;
		if binary_path.exists() {
			return Self::load(binary_path);
		}

		let mut store = Self::new();
		store.train_file(&corpus_path)?;
		store.save(binary_path)?;
		Ok(store)
	}

	/// Loads a store from a postcard binary file.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
		let bytes = std::fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}

	/// Writes the store to a postcard binary file.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// The configured sentence-end character set.
	pub fn sentence_ends(&self) -> &str {
		&self.sentence_ends
	}

	/// True if `token` ends a sentence.
	///
	/// Detection is substring-based: a token is a sentence end if it
	/// contains any configured end character, so trailing punctuation
	/// attached to a word (`"word."`) is detected.
	pub fn is_sentence_end(&self, token: &str) -> bool {
		token.chars().any(|c| self.sentence_ends.contains(c))
	}

	/// Ingests a token stream, sliding a 3-word (first, second, result)
	/// window across it in order and accumulating counts.
	///
	/// A window is recorded as a sentence start only when it is the first
	/// window of the stream, or when it immediately follows a window whose
	/// first token was a sentence end.
	///
	/// The whole batch is staged first and committed in one step at the
	/// end of the pass, so a stream that fails mid-way leaves no partial
	/// counts behind.
	///
	/// # Returns
	/// The number of windows committed.
	///
	/// # Errors
	/// `InputTooShort` if the stream yields fewer than 3 tokens; the store
	/// is left unchanged.
	pub fn ingest<I>(&mut self, tokens: I) -> Result<usize, ModelError>
	where
		I: IntoIterator,
		I::Item: Into<String>,
	{
		let mut staged: BTreeMap<(String, String), ContextState> = BTreeMap::new();
		let mut window: VecDeque<String> = VecDeque::with_capacity(3);
		let mut seen = 0usize;
		let mut windows = 0usize;

		// The first window of the stream opens a sentence.
		let mut sentence_start = true;

		for token in tokens {
			seen += 1;
			window.push_back(token.into());
			if window.len() < 3 {
				continue;
			}

			staged
				.entry((window[0].clone(), window[1].clone()))
				.or_insert_with(|| ContextState::new(&window[0], &window[1]))
				.record(&window[2], sentence_start);
			windows += 1;

			// The next window opens a sentence iff this one's first token
			// closed one.
			sentence_start = self.is_sentence_end(&window[0]);
			window.pop_front();
		}

		if seen < 3 {
			return Err(ModelError::InputTooShort { got: seen });
		}

		// Single commit point: nothing above touched `self.contexts`.
		for (key, state) in staged {
			if let Some(existing) = self.contexts.get_mut(&key) {
				existing.merge(&state);
			} else {
				self.contexts.insert(key, state);
			}
		}

		Ok(windows)
	}

	/// Trains the store from a corpus file, one post per line, words
	/// whitespace-delimited.
	///
	/// Lines are split into chunks (CPU cores * factor) and partial stores
	/// are built in parallel, merged, and committed into `self` as a single
	/// batch.
	///
	/// # Returns
	/// The total number of windows trained.
	///
	/// # Errors
	/// `InputTooShort` if the corpus yields no full window; file I/O
	/// errors otherwise.
	///
	/// # Notes
	/// - Uses MPSC channels to collect partial stores from threads.
	/// - Windows never span two chunks; with whole posts per chunk the
	///   handful of lost seams is noise against a real corpus.
	pub fn train_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, ModelError> {
		let lines = read_file(path)?;
		if lines.is_empty() {
			return Err(ModelError::InputTooShort { got: 0 });
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = ((lines.len() + chunks - 1) / chunks).max(1);

		let (tx, rx) = mpsc::channel();
		for chunk in lines.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();
			let sentence_ends = self.sentence_ends.clone();

			thread::spawn(move || {
				let mut partial = TransitionStore::with_sentence_ends(&sentence_ends);
				// In-memory ingestion only fails when the chunk is shorter
				// than one window; such a chunk trains nothing.
				let windows = partial
					.ingest(
						chunk
							.iter()
							.flat_map(|line| line.split_whitespace().map(str::to_owned)),
					)
					.unwrap_or(0);
				tx.send((partial, windows)).expect("Failed to send from thread");
			});
		}
		drop(tx);

		let mut batch = TransitionStore::with_sentence_ends(&self.sentence_ends);
		let mut trained = 0usize;
		for (partial, windows) in rx.iter() {
			batch.merge(&partial)?;
			trained += windows;
		}

		if trained == 0 {
			let got = lines.iter().map(|l| l.split_whitespace().count()).sum();
			return Err(ModelError::InputTooShort { got });
		}

		self.merge(&batch)?;
		Ok(trained)
	}

	/// Returns a uniformly-random (first, second) pair drawn from the set
	/// of stored triples whose sentence-start flag is set.
	///
	/// The draw is uniform over distinct start triples, not weighted by
	/// frequency: a pair that opened several distinct sentences is
	/// proportionally more likely than one that opened a single one.
	///
	/// # Errors
	/// `EmptyModel` if no sentence-start triple exists.
	pub fn sample_start(&self) -> Result<(String, String), ModelError> {
		self.sample_start_with(&mut rand::rng())
	}

	/// Seedable variant of [`sample_start`](Self::sample_start).
	pub fn sample_start_with<R: Rng>(&self, rng: &mut R) -> Result<(String, String), ModelError> {
		self.contexts
			.values()
			.flat_map(|state| {
				state
					.continuations()
					.filter(|(_, c)| c.sentence_start)
					.map(move |_| (state.first(), state.second()))
			})
			.choose(rng)
			.map(|(first, second)| (first.to_owned(), second.to_owned()))
			.ok_or(ModelError::EmptyModel)
	}

	/// Samples one result word for the given context, with probability
	/// proportional to observed frequency.
	///
	/// The candidate set is every stored triple for (first, second),
	/// regardless of sentence-start flags.
	///
	/// # Errors
	/// `NoContinuation` if no triple exists for that context (a dead end
	/// in the chain).
	pub fn sample_next(&self, first: &str, second: &str) -> Result<String, ModelError> {
		self.sample_next_with(first, second, &mut rand::rng())
	}

	/// Seedable variant of [`sample_next`](Self::sample_next).
	pub fn sample_next_with<R: Rng>(
		&self,
		first: &str,
		second: &str,
		rng: &mut R,
	) -> Result<String, ModelError> {
		let state = self
			.contexts
			.get(&(first.to_owned(), second.to_owned()))
			.ok_or_else(|| ModelError::NoContinuation {
				first: first.to_owned(),
				second: second.to_owned(),
			})?;

		state
			.pick(rng)
			.map(str::to_owned)
			.ok_or_else(|| ModelError::NoContinuation {
				first: first.to_owned(),
				second: second.to_owned(),
			})
	}

	/// Merges another store into this one.
	///
	/// Frequencies of matching triples are summed and sentence-start flags
	/// are OR-ed; contexts missing on either side are carried over.
	///
	/// # Errors
	/// `ConfigMismatch` if the sentence-end sets of the two stores differ.
	pub fn merge(&mut self, other: &Self) -> Result<(), ModelError> {
		if self.sentence_ends != other.sentence_ends {
			return Err(ModelError::ConfigMismatch {
				ours: self.sentence_ends.clone(),
				theirs: other.sentence_ends.clone(),
			});
		}

		for (key, state) in &other.contexts {
			if let Some(existing) = self.contexts.get_mut(key) {
				existing.merge(state);
			} else {
				self.contexts.insert(key.clone(), state.clone());
			}
		}

		Ok(())
	}

	/// Returns the state for a (first, second) context, if any.
	pub fn context(&self, first: &str, second: &str) -> Option<&ContextState> {
		self.contexts.get(&(first.to_owned(), second.to_owned()))
	}

	/// Returns the stored attributes of one triple, if it was observed.
	pub fn continuation(&self, first: &str, second: &str, result: &str) -> Option<&Continuation> {
		self.context(first, second)?.continuation(result)
	}

	/// Number of distinct (first, second) contexts.
	pub fn context_count(&self) -> usize {
		self.contexts.len()
	}

	/// Number of distinct (first, second, result) triples.
	pub fn transition_count(&self) -> usize {
		self.contexts.values().map(ContextState::len).sum()
	}

	/// Number of triples whose sentence-start flag is set.
	pub fn start_count(&self) -> usize {
		self.contexts
			.values()
			.flat_map(ContextState::continuations)
			.filter(|(_, c)| c.sentence_start)
			.count()
	}

	/// True if the store holds no transition at all.
	pub fn is_empty(&self) -> bool {
		self.contexts.is_empty()
	}
}

impl Default for TransitionStore {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn tokens(words: &[&str]) -> Vec<String> {
		words.iter().map(|w| w.to_string()).collect()
	}

	#[test]
	fn ingest_counts_accumulate() {
		let mut store = TransitionStore::new();
		for _ in 0..3 {
			store.ingest(tokens(&["a", "b", "c"])).unwrap();
		}

		assert_eq!(store.continuation("a", "b", "c").unwrap().frequency, 3);
		assert_eq!(store.transition_count(), 1);
		assert_eq!(store.context_count(), 1);
	}

	#[test]
	fn ingest_reports_window_count() {
		let mut store = TransitionStore::new();
		let windows = store
			.ingest(tokens(&["a", "b", "c", "d", "e"]))
			.unwrap();
		assert_eq!(windows, 3);
	}

	#[test]
	fn ingest_too_short_leaves_store_untouched() {
		let mut store = TransitionStore::new();

		let err = store.ingest(tokens(&["a", "b"])).unwrap_err();
		assert!(matches!(err, ModelError::InputTooShort { got: 2 }));

		let err = store.ingest(Vec::<String>::new()).unwrap_err();
		assert!(matches!(err, ModelError::InputTooShort { got: 0 }));

		assert!(store.is_empty());
	}

	#[test]
	fn sentence_start_flags_follow_the_window_rule() {
		let mut store = TransitionStore::new();
		store
			.ingest(tokens(&["Hi", "there.", "Bob", "is", "cool."]))
			.unwrap();

		// First window of the stream.
		assert!(store.continuation("Hi", "there.", "Bob").unwrap().sentence_start);
		// Previous window's first token ("Hi") did not close a sentence.
		assert!(!store.continuation("there.", "Bob", "is").unwrap().sentence_start);
		// Previous window's first token ("there.") closed one.
		assert!(store.continuation("Bob", "is", "cool.").unwrap().sentence_start);
	}

	#[test]
	fn sentence_end_detection_is_substring_based() {
		let store = TransitionStore::new();
		assert!(store.is_sentence_end("word."));
		assert!(store.is_sentence_end("wo.rd"));
		assert!(store.is_sentence_end("what?!"));
		assert!(!store.is_sentence_end("word"));

		let custom = TransitionStore::with_sentence_ends("|");
		assert!(custom.is_sentence_end("stop|"));
		assert!(!custom.is_sentence_end("stop."));
	}

	#[test]
	fn every_ingested_window_is_queryable() {
		let words = ["the", "cat", "sat.", "the", "cat", "ran.", "the", "dog", "sat."];
		let mut store = TransitionStore::new();
		store.ingest(tokens(&words)).unwrap();

		for window in words.windows(3) {
			let c = store
				.continuation(window[0], window[1], window[2])
				.unwrap_or_else(|| panic!("missing triple {window:?}"));
			assert!(c.frequency >= 1);
		}
	}

	#[test]
	fn sample_start_on_empty_store_fails() {
		let store = TransitionStore::new();
		assert!(matches!(store.sample_start(), Err(ModelError::EmptyModel)));
	}

	#[test]
	fn sample_start_only_returns_start_pairs() {
		let mut store = TransitionStore::new();
		store
			.ingest(tokens(&["Hi", "there.", "Bob", "is", "cool.", "so", "is", "Sue."]))
			.unwrap();

		let mut rng = StdRng::seed_from_u64(3);
		for _ in 0..50 {
			let (first, second) = store.sample_start_with(&mut rng).unwrap();
			let state = store.context(&first, &second).unwrap();
			assert!(
				state.continuations().any(|(_, c)| c.sentence_start),
				"({first:?}, {second:?}) is not a start pair"
			);
		}
	}

	#[test]
	fn sample_next_unknown_context_is_a_dead_end() {
		let mut store = TransitionStore::new();
		store.ingest(tokens(&["x", "y", "z"])).unwrap();

		let err = store.sample_next("y", "z").unwrap_err();
		assert!(matches!(err, ModelError::NoContinuation { .. }));
	}

	#[test]
	fn sample_next_follows_frequency_proportions() {
		let mut store = TransitionStore::new();
		for _ in 0..3 {
			store.ingest(tokens(&["a", "b", "c"])).unwrap();
		}
		store.ingest(tokens(&["a", "b", "d"])).unwrap();

		let mut rng = StdRng::seed_from_u64(42);
		let draws = 1000;
		let mut c_count = 0;
		for _ in 0..draws {
			if store.sample_next_with("a", "b", &mut rng).unwrap() == "c" {
				c_count += 1;
			}
		}
		assert!(
			(700..=800).contains(&c_count),
			"expected ~750 draws of \"c\", got {c_count}"
		);
	}

	#[test]
	fn merge_sums_counts_and_rejects_mismatched_ends() {
		let mut left = TransitionStore::new();
		left.ingest(tokens(&["a", "b", "c"])).unwrap();

		let mut right = TransitionStore::new();
		right.ingest(tokens(&["a", "b", "c", "d"])).unwrap();

		left.merge(&right).unwrap();
		assert_eq!(left.continuation("a", "b", "c").unwrap().frequency, 2);
		assert_eq!(left.continuation("b", "c", "d").unwrap().frequency, 1);

		let other = TransitionStore::with_sentence_ends("!");
		assert!(matches!(
			left.merge(&other),
			Err(ModelError::ConfigMismatch { .. })
		));
	}
}
