use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Scalar metrics sink backed by a CSV file in the log directory. One row per
/// (metric, step) pair; `close` consumes the logger and flushes the file.
pub struct MetricsLogger {
    writer: BufWriter<File>,
}

impl MetricsLogger {
    /// Starts a fresh log, truncating any previous `metrics.csv`.
    pub fn create(log_dir: &Path) -> Result<Self> {
        Self::open(log_dir, false)
    }

    /// Continues an earlier run's log, keeping its rows.
    pub fn append(log_dir: &Path) -> Result<Self> {
        Self::open(log_dir, true)
    }

    fn open(log_dir: &Path, append: bool) -> Result<Self> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("failed to create log dir {}", log_dir.display()))?;
        let path = log_dir.join("metrics.csv");
        let mut options = OpenOptions::new();
        if append {
            options.create(true).append(true);
        } else {
            options.create(true).write(true).truncate(true);
        }
        let file = options
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let existing_len = file.metadata()?.len();
        let mut writer = BufWriter::new(file);
        if !append || existing_len == 0 {
            writeln!(writer, "metric,step,value")?;
        }
        Ok(Self { writer })
    }

    pub fn log_scalar(&mut self, name: &str, value: f32, step: usize) -> Result<()> {
        writeln!(self.writer, "{name},{step},{value:.6}")?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
