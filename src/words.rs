use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::WordSourceError;
use crate::round::RoundId;
use crate::runtime::GameEvent;
use crate::vocabulary::{Vocabulary, VocabularyError};

const MAX_RECENT_WORDS: usize = 10;
const MIN_AVAILABLE_WORDS: usize = 5;
const KEEP_WHEN_EXHAUSTED: usize = 3;

/// Supplies the word the player has to draw
pub trait WordSource: Send + Sync + 'static {
    fn fetch_target_word(&self) -> Result<String, WordSourceError>;
}

/// Fetches on a worker thread and posts `WordFetched` for `round`
pub fn fetch_in_background(source: Arc<dyn WordSource>, tx: Sender<GameEvent>, round: RoundId) {
    thread::spawn(move || {
        let result = source.fetch_target_word();
        let _ = tx.send(GameEvent::WordFetched { round, result });
    });
}

/// Picks from a local word list, avoiding the most recent picks
#[derive(Debug)]
pub struct BuiltinWordSource {
    words: Vec<String>,
    recent: Mutex<VecDeque<String>>,
}

impl BuiltinWordSource {
    pub fn new(words: Vec<String>) -> Self {
        Self {
            words,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_vocabulary() -> Result<Self, VocabularyError> {
        Ok(Self::new(Vocabulary::builtin()?.words))
    }

    fn pick(&self, recent: &mut VecDeque<String>) -> Option<String> {
        let mut rng = rand::thread_rng();

        let mut available: Vec<&String> =
            self.words.iter().filter(|w| !recent.contains(w)).collect();
        if available.len() < MIN_AVAILABLE_WORDS {
            if recent.len() > KEEP_WHEN_EXHAUSTED {
                let drop = recent.len() - KEEP_WHEN_EXHAUSTED;
                recent.drain(..drop);
            } else {
                recent.clear();
            }
            available = self.words.iter().filter(|w| !recent.contains(w)).collect();
        }

        let word = (*available.choose(&mut rng)?).clone();
        recent.push_back(word.clone());
        if recent.len() > MAX_RECENT_WORDS {
            recent.pop_front();
        }
        Some(word)
    }
}

impl WordSource for BuiltinWordSource {
    fn fetch_target_word(&self) -> Result<String, WordSourceError> {
        // a poisoned history only loses repeat avoidance
        let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        self.pick(&mut recent).ok_or(WordSourceError::Exhausted)
    }
}

#[derive(Deserialize)]
struct WordResponse {
    word: Option<String>,
}

/// `GET {base}/random-word` answering `{"word": "..."}`
#[derive(Debug, Clone)]
pub struct HttpWordSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpWordSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WordSourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/random-word", base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl WordSource for HttpWordSource {
    fn fetch_target_word(&self) -> Result<String, WordSourceError> {
        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(WordSourceError::Status(status.as_u16()));
        }

        let body: WordResponse = response.json()?;
        match body.word.map(|w| w.trim().to_string()) {
            Some(word) if !word.is_empty() => Ok(word),
            _ => Err(WordSourceError::EmptyWord),
        }
    }
}
