//! Bot settings, loaded from a JSON file. Every field has a default so a
//! missing file means stock settings.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use mimic_core::model::generator::DEFAULT_MAX_TOKENS;
use mimic_core::model::store::DEFAULT_SENTENCE_ENDS;

use crate::composer::DEFAULT_MAX_POST_LEN;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct BotConfig {
    /// Raw post archive used for initial training, one post per line.
    pub archive_file: PathBuf,
    /// Where the cleaned corpus is written.
    pub clean_data_file: PathBuf,
    /// Where the trained model binary is written.
    pub model_file: PathBuf,
    /// Where the bot's JSON run state lives.
    pub bot_data_file: PathBuf,
    /// Post length bound, in characters.
    pub max_post_len: usize,
    /// One-in-N odds of posting on a given run.
    pub post_odds: u32,
    /// When false, composed posts are printed instead of published.
    pub live_post: bool,
    /// Characters that mark a token as a sentence end.
    pub sentence_ends: String,
    /// Length bound on a generated sentence, in tokens.
    pub max_tokens: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            archive_file: PathBuf::from("data/post_archive.txt"),
            clean_data_file: PathBuf::from("data/cleaned_post_data.txt"),
            model_file: PathBuf::from("data/model.bin"),
            bot_data_file: PathBuf::from("data/bot_data.json"),
            max_post_len: DEFAULT_MAX_POST_LEN,
            post_odds: 1,
            live_post: false,
            sentence_ends: DEFAULT_SENTENCE_ENDS.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl BotConfig {
    /// Loads the config file, or returns stock settings when it is absent.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("malformed config file {}", path.as_ref().display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e)
                .with_context(|| format!("could not read config file {}", path.as_ref().display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = BotConfig::load("no/such/config.json").unwrap();
        assert_eq!(config.post_odds, 1);
        assert_eq!(config.sentence_ends, DEFAULT_SENTENCE_ENDS);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"post_odds": 8, "live_post": true}"#).unwrap();

        let config = BotConfig::load(&path).unwrap();
        assert_eq!(config.post_odds, 8);
        assert!(config.live_post);
        assert_eq!(config.max_post_len, DEFAULT_MAX_POST_LEN);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
