//! The posting bot binary.
//!
//! Subcommands:
//! - `setup` — clean the raw archive, train the model, write run state
//! - `ingest <file>` — fold freshly fetched raw posts into the model
//! - `run` — roll the posting odds, compose a post, dump run state
//! - `clean <in> <out>` — run the corpus cleaner alone

mod botdata;
mod cleaner;
mod composer;
mod config;

use anyhow::{Context, bail};
use rand::Rng;

use mimic_core::model::generator::SentenceGenerator;
use mimic_core::model::store::TransitionStore;

use crate::botdata::BotData;
use crate::composer::Composer;
use crate::config::BotConfig;

const CONFIG_FILE: &str = "mimic.json";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("setup") => setup(&BotConfig::load(CONFIG_FILE)?),
        Some("run") => run(&BotConfig::load(CONFIG_FILE)?),
        Some("ingest") => {
            let input = args
                .get(1)
                .context("usage: mimic-bot ingest <raw-posts-file>")?;
            ingest(&BotConfig::load(CONFIG_FILE)?, input)
        }
        Some("clean") => {
            let input = args.get(1).context("usage: mimic-bot clean <input> <output>")?;
            let output = args.get(2).context("usage: mimic-bot clean <input> <output>")?;
            clean_file(input, output)
        }
        _ => bail!("usage: mimic-bot <setup|run|ingest|clean>"),
    }
}

/// Sets the bot up from the raw post archive: cleans it, trains the
/// model, and writes a fresh run-state file.
fn setup(config: &BotConfig) -> anyhow::Result<()> {
    log::info!("Cleaning up archive data.");
    let raw = std::fs::read_to_string(&config.archive_file)
        .with_context(|| format!("could not read archive {}", config.archive_file.display()))?;
    let cleaned = cleaner::clean(&raw);
    if let Some(parent) = config.clean_data_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config.clean_data_file, &cleaned)?;

    log::info!("Training the model.");
    let mut store = TransitionStore::with_sentence_ends(&config.sentence_ends);
    let windows = store.train_file(&config.clean_data_file)?;
    log::info!("Trained {windows} windows.");
    store.save(&config.model_file)?;

    log::info!("Writing a fresh bot data file.");
    BotData::default().save(&config.bot_data_file)?;

    log::info!("All finished.");
    Ok(())
}

/// Folds freshly fetched raw posts into the trained model.
fn ingest(config: &BotConfig, input: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("could not read posts file {input}"))?;

    let mut store = load_store(config)?;
    let windows = store.ingest(cleaner::tokens(&cleaner::clean(&raw)))?;
    log::info!("Ingested {windows} windows.");
    store.save(&config.model_file)?;
    Ok(())
}

/// One bot run: maybe compose and publish a post, then dump run state.
fn run(config: &BotConfig) -> anyhow::Result<()> {
    log::info!("Initializing the bot.");
    let bot_data = BotData::load(&config.bot_data_file)?;
    log::info!("Last id seen: {:?}", bot_data.last_id_seen);
    let store = load_store(config)?;

    let mut rng = rand::rng();
    let roll = if config.post_odds <= 1 {
        0
    } else {
        rng.random_range(0..config.post_odds)
    };
    if roll == 0 {
        log::info!("Rolled {roll}. Posting a new post.");
        let generator = SentenceGenerator::new(&store).with_max_tokens(config.max_tokens);
        let composer = Composer::new(config.max_post_len);
        let post = composer.compose(&generator, &mut rng)?;
        publish(&post, config.live_post);
    } else {
        log::info!("Rolled {roll}. Not posting this time.");
    }

    log::info!("Dumping bot data to JSON.");
    bot_data.save(&config.bot_data_file)?;

    log::info!("All finished.");
    Ok(())
}

/// Cleans a raw post archive into a training corpus file.
fn clean_file(input: &str, output: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("could not read {input}"))?;
    std::fs::write(output, cleaner::clean(&raw))
        .with_context(|| format!("could not write {output}"))?;
    Ok(())
}

fn load_store(config: &BotConfig) -> anyhow::Result<TransitionStore> {
    TransitionStore::load(&config.model_file).with_context(|| {
        format!(
            "could not load model {}; have you run `mimic-bot setup` yet?",
            config.model_file.display()
        )
    })
}

/// Hands a composed post to the publishing side.
///
/// Remote publishing goes through an external collaborator; with none
/// wired in, the post is printed so the run can be inspected.
fn publish(post: &str, live_post: bool) {
    if live_post {
        log::warn!("Live posting requested but no publisher is wired in.");
    } else {
        log::info!("Live posting disabled. Printing post without publishing.");
    }
    println!("{post}");
}
