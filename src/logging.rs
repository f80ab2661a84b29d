use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "DOODLE_LOG";

/// Filter from `DOODLE_LOG`, then `RUST_LOG`, then `info`
pub fn env_filter() -> EnvFilter {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Sends tracing output to `path`; the terminal belongs to the UI.
///
/// Safe to call more than once, later calls leave the first subscriber in place.
pub fn init(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .ok();
    Ok(())
}
