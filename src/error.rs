use thiserror::Error;

/// Failure to produce a target word. Fatal to the running session.
#[derive(Debug, Error)]
pub enum WordSourceError {
    #[error("word request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("word service answered with status {0}")]
    Status(u16),
    #[error("word service returned an empty word")]
    EmptyWord,
    #[error("no words available")]
    Exhausted,
}

/// Failure of a single classification call. Transient; the round goes on.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("classifier answered with status {0}")]
    Status(u16),
    #[error("classifier reported: {0}")]
    Service(String),
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("could not load a word to draw: {0}")]
    WordFetchFailed(#[from] WordSourceError),
    #[error("prediction failed: {0}")]
    PredictionFailed(#[from] ClassifierError),
}
