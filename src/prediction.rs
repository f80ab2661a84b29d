use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use itertools::Itertools;

use crate::error::ClassifierError;
use crate::round::RoundId;
use crate::runtime::GameEvent;
use crate::surface::Snapshot;

pub const UNKNOWN_LABEL: &str = "unknown";

/// Openers a classifier tends to put in front of its answer
const HEDGE_PHRASES: &[&str] = &[
    "this is a",
    "it's a",
    "looks like a",
    "appears to be a",
    "seems like a",
];

const GENERIC_NOUNS: &[&str] = &["doodle", "drawing", "sketch", "image", "picture"];

/// Image in, free text label out
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, image: &Snapshot) -> Result<String, ClassifierError>;
}

/// Reduces a classifier answer to a single guess word.
///
/// "It's a cute doodle of a cat!" -> "cat". Falls back to `"unknown"`.
pub fn clean_prediction_text(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut text = lowered.trim_start();
    if let Some(rest) = HEDGE_PHRASES.iter().find_map(|p| text.strip_prefix(p)) {
        text = rest;
    }

    let unpunctuated: String = isolate_generic_nouns(text)
        .chars()
        .filter(|c| is_word_char(*c) || c.is_whitespace())
        .collect();
    let mut tokens: Vec<&str> = unpunctuated.split_whitespace().collect();

    // "<noun> of X" names X
    if let Some(pos) = tokens
        .windows(2)
        .rposition(|w| GENERIC_NOUNS.contains(&w[0]) && w[1] == "of")
    {
        tokens.drain(..pos + 2);
    }

    tokens
        .into_iter()
        .filter(|t| !GENERIC_NOUNS.contains(t))
        .find(|t| t.chars().count() > 2)
        .map_or_else(|| UNKNOWN_LABEL.to_string(), str::to_string)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Pads whole-word generic nouns with spaces so that dropping punctuation
/// cannot glue them to a neighbour ("sketch-like" stays "sketch like").
fn isolate_generic_nouns(text: &str) -> String {
    text.chars()
        .chunk_by(|c| is_word_char(*c))
        .into_iter()
        .map(|(_, run)| {
            let run: String = run.collect();
            if GENERIC_NOUNS.contains(&run.as_str()) {
                format!(" {run} ")
            } else {
                run
            }
        })
        .collect()
}

/// Runs classification off the event loop and posts the cleaned label back.
///
/// Holds no round state: the caller marks the round in flight before
/// `invoke` and the completion event carries the round id so a late answer
/// can be recognised and dropped.
pub struct PredictionInvoker {
    classifier: Arc<dyn Classifier>,
    events: Sender<GameEvent>,
}

impl PredictionInvoker {
    pub fn new(classifier: Arc<dyn Classifier>, events: Sender<GameEvent>) -> Self {
        Self { classifier, events }
    }

    pub fn invoke(&self, round: RoundId, image: Snapshot) {
        let classifier = Arc::clone(&self.classifier);
        let events = self.events.clone();
        thread::spawn(move || {
            let result = classifier.classify(&image).map(|raw| {
                let label = clean_prediction_text(&raw);
                tracing::debug!(%round, raw = %raw, %label, "classifier answered");
                label
            });
            // Receiver gone means the app is shutting down
            let _ = events.send(GameEvent::PredictionDone { round, result });
        });
    }
}
