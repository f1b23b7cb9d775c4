//! JSON file source
//!
//! Accepts either a single JSON array of row objects or, when the file name
//! ends in `.jsonl`, one row object per line (blank lines ignored).

use super::{SourceError, SourceResult, TicketSource};
use crate::record::{row_from_json, rows_from_json, RawRow};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_json_lines(&self) -> bool {
        self.path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("jsonl"))
    }

    fn open(&self) -> SourceResult<BufReader<File>> {
        File::open(&self.path)
            .map(BufReader::new)
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn load_array(&self) -> SourceResult<Vec<RawRow>> {
        let value: serde_json::Value = serde_json::from_reader(self.open()?)
            .map_err(|source| SourceError::Json {
                line: source.line(),
                source,
            })?;
        Ok(rows_from_json(&value)?)
    }

    fn load_lines(&self) -> SourceResult<Vec<RawRow>> {
        let mut rows = Vec::new();
        for (idx, line) in self.open()?.lines().enumerate() {
            let line = line.map_err(|source| self.io_error(source))?;
            if line.trim().is_empty() {
                continue;
            }
            let value: serde_json::Value = serde_json::from_str(&line)
                .map_err(|source| SourceError::Json { line: idx + 1, source })?;
            rows.push(row_from_json(rows.len(), &value)?);
        }
        Ok(rows)
    }
}

impl TicketSource for JsonFileSource {
    fn load(&mut self) -> SourceResult<Vec<RawRow>> {
        let rows = if self.is_json_lines() {
            self.load_lines()?
        } else {
            self.load_array()?
        };
        debug!("Read {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}
