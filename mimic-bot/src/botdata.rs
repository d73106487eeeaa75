//! Bot run state: the remote item ids already processed, persisted as a
//! small JSON file between runs.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Ids of the most recent remote items the bot has seen.
///
/// `setup` writes a fresh file; `run` reloads and re-dumps it so the
/// fetch collaborators can pick up where the last run stopped.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BotData {
    pub last_id_seen: Option<u64>,
    pub last_reply_id_seen: Option<u64>,
}

impl BotData {
    /// Loads the bot data file.
    ///
    /// # Errors
    /// Fails when the file is missing (the setup step has not been run)
    /// or does not parse.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "could not read bot data file {}; have you run `mimic-bot setup` yet?",
                path.as_ref().display()
            )
        })?;
        serde_json::from_str(&contents).context("malformed bot data file")
    }

    /// Dumps the bot data to JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = serde_json::to_string(self)?;
        std::fs::write(&path, contents).with_context(|| {
            format!("could not write bot data file {}", path.as_ref().display())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.json");

        let data = BotData {
            last_id_seen: Some(987654321),
            last_reply_id_seen: None,
        };
        data.save(&path).unwrap();
        assert_eq!(BotData::load(&path).unwrap(), data);
    }

    #[test]
    fn missing_file_points_at_setup() {
        let err = BotData::load("no/such/bot_data.json").unwrap_err();
        assert!(err.to_string().contains("setup"));
    }
}
