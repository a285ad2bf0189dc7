//! Structured scalar stream for external visualization.
//!
//! One JSON line per scalar, keyed by metric name and global step, written
//! to `summary/scalars.jsonl` under the log directory and flushed
//! immediately so a watcher sees values mid-run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::utils::error::{Result, TrainError};

const SUMMARY_DIR: &str = "summary";
const SCALARS_FILE: &str = "scalars.jsonl";

#[derive(Debug, Serialize)]
struct ScalarRecord<'a> {
    metric: &'a str,
    step: usize,
    value: f64,
}

/// Append-only writer for the scalar time series of one run.
pub struct ScalarWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl ScalarWriter {
    /// Create `summary/scalars.jsonl` under the log directory, truncating
    /// any previous run's stream.
    pub fn create(log_dir: &Path) -> Result<Self> {
        let dir = log_dir.join(SUMMARY_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(SCALARS_FILE);
        let file = File::create(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append one scalar and flush.
    pub fn scalar(&mut self, metric: &str, step: usize, value: f64) -> Result<()> {
        let record = ScalarRecord {
            metric,
            step,
            value,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| TrainError::Computation(format!("summary serialization: {e}")))?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
