use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app_dirs::AppDirs;
use crate::session::SessionConfig;
use crate::throttle::{ThrottlePolicy, DRAW_SETTLE_MS, PREDICTION_THROTTLE_MS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WordSourceKind {
    /// bundled drawing-friendly vocabulary
    Builtin,
    /// `GET <service-url>/random-word`
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub max_rounds: usize,
    pub round_secs: u32,
    pub tick_ms: u64,
    pub draw_settle_ms: u64,
    pub prediction_throttle_ms: u64,
    pub advance_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub service_url: String,
    pub word_source: WordSourceKind,
    pub narration_command: Option<String>,
    pub canvas_width: usize,
    pub canvas_height: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rounds: 6,
            round_secs: 20,
            tick_ms: 1000,
            draw_settle_ms: DRAW_SETTLE_MS,
            prediction_throttle_ms: PREDICTION_THROTTLE_MS,
            advance_delay_ms: 3000,
            request_timeout_ms: 15_000,
            service_url: "http://127.0.0.1:5000".to_string(),
            word_source: WordSourceKind::Builtin,
            narration_command: None,
            canvas_width: 256,
            canvas_height: 192,
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_rounds: self.max_rounds.max(1),
            round_secs: self.round_secs.max(1),
            advance_delay: Duration::from_millis(self.advance_delay_ms),
            throttle: ThrottlePolicy::new(self.draw_settle_ms, self.prediction_throttle_ms),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl From<&crate::cli::Cli> for Config {
    /// Stored config with every flag given on the command line applied on top
    fn from(cli: &crate::cli::Cli) -> Self {
        let store = match &cli.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut cfg = store.load();
        cli.apply(&mut cfg);
        cfg
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("doodle_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|err| {
                tracing::warn!(path = %self.path.display(), %err, "ignoring unreadable config");
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}
