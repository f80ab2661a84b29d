use include_dir::{include_dir, Dir};
use serde::Deserialize;
use thiserror::Error;

static VOCAB_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/vocabulary");

pub const WORDS_FILE: &str = "words.json";
pub const SYNONYMS_FILE: &str = "synonyms.json";

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("vocabulary file {0} is not bundled")]
    Missing(String),
    #[error("vocabulary file {0} is not valid utf-8")]
    Encoding(String),
    #[error("vocabulary file {file} is malformed: {source}")]
    Malformed {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Drawing-friendly words a round target is picked from
#[derive(Deserialize, Clone, Debug)]
pub struct Vocabulary {
    pub name: String,
    pub words: Vec<String>,
}

impl Vocabulary {
    pub fn builtin() -> Result<Self, VocabularyError> {
        read_bundled(WORDS_FILE)
    }
}

/// Deserializes one of the JSON files bundled under `src/vocabulary`
pub fn read_bundled<T: serde::de::DeserializeOwned>(file_name: &str) -> Result<T, VocabularyError> {
    let file = VOCAB_DIR
        .get_file(file_name)
        .ok_or_else(|| VocabularyError::Missing(file_name.to_string()))?;

    let contents = file
        .contents_utf8()
        .ok_or_else(|| VocabularyError::Encoding(file_name.to_string()))?;

    serde_json::from_str(contents).map_err(|source| VocabularyError::Malformed {
        file: file_name.to_string(),
        source,
    })
}
