//! Durable daily log: `migration-YYYY-MM-DD.log`, one entry per line

use crate::event::LogEntry;
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Appends log entries to one file per UTC day
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the entries of `date`
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("migration-{}.log", date.format("%Y-%m-%d")))
    }

    pub fn append(&self, entry: &LogEntry) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.file_for(entry.timestamp.date_naive());
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", entry.line())?;
        Ok(path)
    }
}
