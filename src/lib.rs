// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod input;
pub mod logging;
pub mod matcher;
pub mod narration;
pub mod prediction;
pub mod round;
pub mod runtime;
pub mod session;
pub mod surface;
pub mod throttle;
pub mod ui;
pub mod vocabulary;
pub mod words;
