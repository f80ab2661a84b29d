use std::collections::HashMap;

use itertools::Itertools;
use serde::Deserialize;

use crate::vocabulary::{self, VocabularyError};

/// Filler words a classifier wraps its answer in
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "drawing", "sketch", "doodle", "picture", "image", "of",
];

/// Canonical word -> alternates a guess may use instead
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SynonymTable {
    entries: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    pub fn builtin() -> Result<Self, VocabularyError> {
        vocabulary::read_bundled(vocabulary::SYNONYMS_FILE)
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// True if either word lists the other as an alternate
    pub fn related(&self, target: &str, prediction: &str) -> bool {
        let lists = |key: &str, word: &str| {
            self.entries
                .get(key)
                .is_some_and(|alts| alts.iter().any(|alt| alt == word))
        };
        lists(target, prediction) || lists(prediction, target)
    }
}

/// Decides whether a cleaned prediction counts as a guess of the target
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    synonyms: SynonymTable,
}

impl Matcher {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    pub fn builtin() -> Result<Self, VocabularyError> {
        Ok(Self::new(SynonymTable::builtin()?))
    }

    pub fn is_match(&self, prediction: &str, target: &str) -> bool {
        let pred = prediction.trim().to_lowercase();
        let targ = target.trim().to_lowercase();
        if pred.is_empty() || targ.is_empty() {
            return false;
        }

        if overlaps(&pred, &targ) {
            return true;
        }

        let stripped = strip_stopwords(&pred);
        // An all-filler guess would otherwise be a substring of anything
        if !stripped.is_empty() && overlaps(&stripped, &targ) {
            return true;
        }

        if self.synonyms.related(&targ, &pred) {
            return true;
        }

        pred.split_whitespace()
            .cartesian_product(targ.split_whitespace().collect::<Vec<_>>())
            .any(|(pw, tw)| {
                pw.chars().count() > 2
                    && tw.chars().count() > 2
                    && (pw.contains(tw) || tw.contains(pw))
            })
    }
}

/// Exact or substring match in either direction
fn overlaps(pred: &str, targ: &str) -> bool {
    pred == targ || pred.contains(targ) || targ.contains(pred)
}

fn strip_stopwords(text: &str) -> String {
    text.split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .join(" ")
}
