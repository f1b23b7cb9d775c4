//! Ticket store adapters
//!
//! The engines only ever see an immutable snapshot of raw rows. Where those
//! rows come from is behind [`TicketSource`]; this crate ships a JSON file
//! adapter and a caching wrapper that reuses a load for a fixed time window.

pub mod cache;
pub mod json;

pub use cache::{CachedSource, DEFAULT_TTL};
pub use json::JsonFileSource;

use crate::record::{normalize, ColumnMap, NormalizeError, RawRow, TicketSnapshot};
use thiserror::Error;
use tracing::info;

/// Errors raised while loading rows
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but is not a table of rows
    #[error("malformed input: {0}")]
    Malformed(#[from] NormalizeError),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Supplies raw ticket rows
pub trait TicketSource {
    /// Fetch the current rows
    fn load(&mut self) -> SourceResult<Vec<RawRow>>;

    /// Human-readable origin, for logs
    fn describe(&self) -> String;
}

impl<S: TicketSource + ?Sized> TicketSource for Box<S> {
    fn load(&mut self) -> SourceResult<Vec<RawRow>> {
        (**self).load()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Load from `source` and normalize into a snapshot
pub fn load_snapshot(source: &mut dyn TicketSource, columns: &ColumnMap) -> SourceResult<TicketSnapshot> {
    let rows = source.load()?;
    let batch = normalize(&rows, columns);
    info!(
        "Loaded {} tickets from {} ({} unparsable timestamps)",
        batch.stats.rows,
        source.describe(),
        batch.stats.unparsable_timestamps
    );
    Ok(batch.into_snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawValue, TextField, TimeField};

    struct Fixed(Vec<RawRow>);

    impl TicketSource for Fixed {
        fn load(&mut self) -> SourceResult<Vec<RawRow>> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    #[test]
    fn test_load_snapshot() {
        let mut row = RawRow::new();
        row.insert("DEMANDANTE".into(), RawValue::from("  ana  "));
        row.insert("DTABERTURA".into(), RawValue::from("2025-01-02 10:00:00"));
        let mut source: Box<dyn TicketSource> = Box::new(Fixed(vec![row]));

        let snapshot = load_snapshot(&mut source, &ColumnMap::default()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.records()[0].requester, "ana");
        assert!(snapshot.schema().has(TimeField::OpenedAt));
        assert!(!snapshot.schema().has(TextField::Status));
    }
}
