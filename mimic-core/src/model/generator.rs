use rand::Rng;

use super::store::TransitionStore;
use crate::error::ModelError;

/// Safety bound on generated sentence length, in tokens.
pub const DEFAULT_MAX_TOKENS: usize = 100;

/// Produces one terminated sentence by walking a transition store.
///
/// # Responsibilities
/// - Seed a sentence from a sampled start pair
/// - Extend it one weighted pick at a time until a sentence-end token
/// - Convert dead ends and runaway walks into an abandoned outcome
///
/// The generator borrows an explicitly constructed store and holds no
/// state of its own between calls, so any number of generators may read
/// the same store concurrently.
#[derive(Debug)]
pub struct SentenceGenerator<'a> {
	store: &'a TransitionStore,
	max_tokens: usize,
}

impl<'a> SentenceGenerator<'a> {
	/// Creates a generator over `store` with the default length bound.
	pub fn new(store: &'a TransitionStore) -> Self {
		Self {
			store,
			max_tokens: DEFAULT_MAX_TOKENS,
		}
	}

	/// Sets the maximum number of tokens a sentence may reach before the
	/// walk is abandoned.
	pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
		self.max_tokens = max_tokens;
		self
	}

	/// Generates one sentence.
	///
	/// # Returns
	/// - `Ok(Some(sentence))` — the walk reached a sentence-end token; the
	///   sentence is the space-joined token sequence.
	/// - `Ok(None)` — the walk was abandoned: either the chain hit a dead
	///   end (a context with no recorded continuation) or the length bound
	///   was reached first. This is a normal outcome; callers are expected
	///   to retry a bounded number of times.
	///
	/// # Errors
	/// `EmptyModel` if the store holds no sentence-start triple, and any
	/// storage failure, both propagated unchanged.
	pub fn generate(&self) -> Result<Option<String>, ModelError> {
		self.generate_with(&mut rand::rng())
	}

	/// Seedable variant of [`generate`](Self::generate).
	pub fn generate_with<R: Rng>(&self, rng: &mut R) -> Result<Option<String>, ModelError> {
		let (mut prev, mut last) = self.store.sample_start_with(rng)?;
		let mut words = vec![prev.clone(), last.clone()];

		loop {
			if self.store.is_sentence_end(&last) {
				return Ok(Some(words.join(" ")));
			}
			if words.len() >= self.max_tokens {
				// A cyclic chain never terminates on its own.
				return Ok(None);
			}

			match self.store.sample_next_with(&prev, &last, rng) {
				Ok(next) => {
					words.push(next.clone());
					prev = std::mem::replace(&mut last, next);
				}
				// Dead end: abandoned, not an error.
				Err(ModelError::NoContinuation { .. }) => return Ok(None),
				Err(e) => return Err(e),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn store_from(words: &[&str]) -> TransitionStore {
		let mut store = TransitionStore::new();
		store.ingest(words.iter().map(|w| w.to_string())).unwrap();
		store
	}

	#[test]
	fn empty_store_propagates_empty_model() {
		let store = TransitionStore::new();
		let generator = SentenceGenerator::new(&store);
		let mut rng = StdRng::seed_from_u64(1);
		assert!(matches!(
			generator.generate_with(&mut rng),
			Err(ModelError::EmptyModel)
		));
	}

	#[test]
	fn single_window_sentence_terminates() {
		let store = store_from(&["my", "dog", "barks."]);
		let generator = SentenceGenerator::new(&store);
		let mut rng = StdRng::seed_from_u64(1);
		assert_eq!(
			generator.generate_with(&mut rng).unwrap(),
			Some("my dog barks.".to_owned())
		);
	}

	#[test]
	fn start_pair_ending_a_sentence_terminates_at_two_words() {
		let store = store_from(&["Stop.", "now.", "ok"]);
		let generator = SentenceGenerator::new(&store);
		let mut rng = StdRng::seed_from_u64(1);
		assert_eq!(
			generator.generate_with(&mut rng).unwrap(),
			Some("Stop. now.".to_owned())
		);
	}

	#[test]
	fn dead_end_abandons_instead_of_failing() {
		// Only triple is ("x", "y") -> "z"; nothing continues ("y", "z").
		let store = store_from(&["x", "y", "z"]);
		let generator = SentenceGenerator::new(&store);
		let mut rng = StdRng::seed_from_u64(1);
		assert_eq!(generator.generate_with(&mut rng).unwrap(), None);
	}

	#[test]
	fn cyclic_chain_abandons_at_the_length_bound() {
		// ("a","b") -> "a" and ("b","a") -> "b": a cycle with no end token.
		let store = store_from(&["a", "b", "a", "b", "a"]);
		let mut rng = StdRng::seed_from_u64(1);

		let generator = SentenceGenerator::new(&store).with_max_tokens(12);
		assert_eq!(generator.generate_with(&mut rng).unwrap(), None);

		let generator = SentenceGenerator::new(&store);
		assert_eq!(generator.generate_with(&mut rng).unwrap(), None);
	}

	#[test]
	fn bound_cuts_exactly_at_max_tokens() {
		// A 12-token linear chain whose only end token is the last word:
		// reachable with the bound at 12, abandoned with the bound at 5.
		let words: Vec<String> = (1..=11)
			.map(|i| format!("w{i}"))
			.chain(std::iter::once("w12.".to_owned()))
			.collect();
		let mut store = TransitionStore::new();
		store.ingest(words.clone()).unwrap();

		let mut rng = StdRng::seed_from_u64(1);
		let generator = SentenceGenerator::new(&store).with_max_tokens(12);
		assert_eq!(
			generator.generate_with(&mut rng).unwrap(),
			Some(words.join(" "))
		);

		let generator = SentenceGenerator::new(&store).with_max_tokens(5);
		assert_eq!(generator.generate_with(&mut rng).unwrap(), None);
	}
}
