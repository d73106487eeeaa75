//! Post composer: assembles a length-bounded post out of generated
//! sentences, retrying a bounded number of times when generation
//! abandons a walk.

use anyhow::Context;
use rand::Rng;

use mimic_core::model::generator::SentenceGenerator;

/// Default post length bound, in characters.
pub const DEFAULT_MAX_POST_LEN: usize = 280;
/// Default number of generation attempts per sentence slot.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Builds posts from one to three generated sentences.
///
/// The first sentence is mandatory; with room to spare there is a chance
/// of a second and then a third. A short post is occasionally shouted in
/// upper case. Sentence thresholds scale with the configured length bound.
pub struct Composer {
    max_post_len: usize,
    max_attempts: u32,
}

impl Composer {
    /// Creates a composer bounded to `max_post_len` characters.
    pub fn new(max_post_len: usize) -> Self {
        Self {
            max_post_len,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many failed draws are tolerated per sentence slot.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Draws one sentence that fits in the remaining room.
    ///
    /// Every failed draw counts against the attempt budget, whether the
    /// walk was abandoned or the sentence would overflow the post.
    /// Returns `Ok(None)` once the budget is spent.
    fn next_sentence<R: Rng>(
        &self,
        generator: &SentenceGenerator<'_>,
        rng: &mut R,
        used: usize,
    ) -> anyhow::Result<Option<String>> {
        let mut failures = 0;
        while failures < self.max_attempts {
            match generator.generate_with(rng)? {
                Some(sentence) if used + sentence.len() + 1 <= self.max_post_len => {
                    return Ok(Some(sentence));
                }
                Some(_) => {
                    failures += 1;
                    log::warn!("Generated sentence does not fit. Trying again.");
                }
                None => {
                    failures += 1;
                    log::warn!("No sentence produced this attempt. Trying again.");
                }
            }
        }
        Ok(None)
    }

    /// Composes and returns a post.
    ///
    /// # Errors
    /// Fails when no opening sentence could be generated within the
    /// attempt budget, or on any store error surfaced by generation.
    pub fn compose<R: Rng>(
        &self,
        generator: &SentenceGenerator<'_>,
        rng: &mut R,
    ) -> anyhow::Result<String> {
        let mut post = self
            .next_sentence(generator, rng, 0)?
            .context("unable to generate an opening sentence")?;

        // If there's room, have a chance at adding a second sentence.
        if post.len() * 2 < self.max_post_len && rng.random_bool(0.65) {
            log::info!("Adding another sentence");
            if let Some(sentence) = self.next_sentence(generator, rng, post.len())? {
                post.push(' ');
                post.push_str(&sentence);
            }

            // Sometimes add one more.
            if post.len() * 3 < self.max_post_len * 2 && rng.random_bool(0.25) {
                if let Some(sentence) = self.next_sentence(generator, rng, post.len())? {
                    post.push(' ');
                    post.push_str(&sentence);
                }
            }
        }

        // Randomly capitalize a short post.
        if post.len() * 7 < self.max_post_len * 3 && rng.random_bool(0.35) {
            post = post.to_uppercase();
        }

        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_core::model::store::TransitionStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn store_from(words: &[&str]) -> TransitionStore {
        let mut store = TransitionStore::new();
        store.ingest(words.iter().map(|w| w.to_string())).unwrap();
        store
    }

    #[test]
    fn composes_one_to_three_sentences() {
        // The only walk this store allows is "my dog barks."
        let store = store_from(&["my", "dog", "barks."]);
        let generator = SentenceGenerator::new(&store);
        let composer = Composer::new(DEFAULT_MAX_POST_LEN);

        let sentence = "my dog barks.";
        let expected = [
            sentence.to_owned(),
            format!("{sentence} {sentence}"),
            format!("{sentence} {sentence} {sentence}"),
        ];

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let post = composer.compose(&generator, &mut rng).unwrap();
            assert!(expected.contains(&post.to_lowercase()), "unexpected post {post:?}");
        }
    }

    #[test]
    fn never_overflows_the_length_bound() {
        let store = store_from(&["my", "dog", "barks."]);
        let generator = SentenceGenerator::new(&store);
        let composer = Composer::new(20);

        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let post = composer.compose(&generator, &mut rng).unwrap();
            assert!(post.len() <= 20);
        }
    }

    #[test]
    fn errors_when_every_walk_is_abandoned() {
        // Dead-end store: the single chain never reaches a sentence end.
        let store = store_from(&["x", "y", "z"]);
        let generator = SentenceGenerator::new(&store);
        let composer = Composer::new(DEFAULT_MAX_POST_LEN);

        let mut rng = StdRng::seed_from_u64(1);
        assert!(composer.compose(&generator, &mut rng).is_err());
    }

    #[test]
    fn propagates_empty_model() {
        let store = TransitionStore::new();
        let generator = SentenceGenerator::new(&store);
        let composer = Composer::new(DEFAULT_MAX_POST_LEN);

        let mut rng = StdRng::seed_from_u64(1);
        assert!(composer.compose(&generator, &mut rng).is_err());
    }
}
