use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, WordSourceKind};

/// draw the word before the clock runs out while a classifier guesses
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    name = "doodle",
    version,
    about,
    long_about = "A terminal drawing game: sketch the target word with your mouse and a remote classifier tries to guess it before the round timer expires."
)]
pub struct Cli {
    /// number of rounds per game
    #[clap(short = 'n', long)]
    pub rounds: Option<usize>,

    /// seconds per round
    #[clap(short = 's', long)]
    pub seconds: Option<u32>,

    /// base url of the word and prediction service
    #[clap(short = 'u', long)]
    pub service_url: Option<String>,

    /// where target words come from
    #[clap(short = 'w', long, value_enum)]
    pub word_source: Option<WordSourceKind>,

    /// speech command for narration, e.g. "espeak -s 150"
    #[clap(long)]
    pub narrate: Option<String>,

    /// disable narration even if configured
    #[clap(long)]
    pub quiet: bool,

    /// milliseconds between timer ticks
    #[clap(long)]
    pub tick_ms: Option<u64>,

    /// read and write settings at this path instead of the default
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// write the merged settings back to the config file
    #[clap(long)]
    pub save_config: bool,
}

impl Cli {
    /// Overrides `cfg` with every flag that was given
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(rounds) = self.rounds {
            cfg.max_rounds = rounds;
        }
        if let Some(secs) = self.seconds {
            cfg.round_secs = secs;
        }
        if let Some(url) = &self.service_url {
            cfg.service_url = url.clone();
        }
        if let Some(kind) = self.word_source {
            cfg.word_source = kind;
        }
        if let Some(cmd) = &self.narrate {
            cfg.narration_command = Some(cmd.clone());
        }
        if self.quiet {
            cfg.narration_command = None;
        }
        if let Some(ms) = self.tick_ms {
            cfg.tick_ms = ms;
        }
    }
}
