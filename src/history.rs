use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::session::Summary;

/// One finished session
#[derive(Debug, Serialize)]
struct ResultRow {
    date: String,
    rounds: usize,
    score: usize,
    percentage: u32,
}

/// Appends finished sessions to a CSV file
#[derive(Debug, Clone)]
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, summary: &Summary, at: DateTime<Local>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // If the file doesn't exist, we need to emit a header
        let needs_header = !self.path.exists();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(ResultRow {
                date: at.to_rfc3339(),
                rounds: summary.max_rounds,
                score: summary.score,
                percentage: summary.percentage(),
            })
            .map_err(io::Error::other)?;
        writer.flush()
    }
}
