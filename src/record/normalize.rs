//! Record normalizer: raw rows in, canonical ticket records out
//!
//! Never fails on cell contents. Unparsable dates become `None`, missing or
//! null-like strings become the empty placeholder. The only fatal condition is
//! input that is not a table at all (see [`normalize_json`]).

use super::field::{ColumnMap, Field, Schema, TextField, TimeField};
use super::ticket::{TicketRecord, TicketSnapshot};
use super::value::{RawRow, RawValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// Placeholder stored for missing strings
pub const MISSING: &str = "";

/// Tokens that dataframe exports write for missing values
const NULL_TOKENS: [&str; 5] = ["none", "nan", "nat", "null", "<na>"];

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Fatal input errors
#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    /// The input is not a sequence of rows
    #[error("input is not a table: expected an array of rows, found {0}")]
    NotATable(&'static str),

    /// One element of the sequence is not a row
    #[error("row {index} is not an object (found {found})")]
    NotARow { index: usize, found: &'static str },
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Counters collected while normalizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub rows: usize,
    /// Non-null date cells that could not be parsed
    pub unparsable_timestamps: usize,
}

/// Output of the normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<TicketRecord>,
    pub schema: Schema,
    pub stats: NormalizeStats,
}

impl NormalizedBatch {
    pub fn into_snapshot(self) -> TicketSnapshot {
        TicketSnapshot::new(self.records, self.schema)
    }

    /// Render the records back into raw rows, emitting only available columns
    pub fn to_raw_rows(&self, columns: &ColumnMap) -> Vec<RawRow> {
        self.records
            .iter()
            .map(|record| to_raw_row(record, &self.schema, columns))
            .collect()
    }
}

fn to_raw_row(record: &TicketRecord, schema: &Schema, columns: &ColumnMap) -> RawRow {
    let mut row = record.extra.clone();
    if schema.has_id() {
        row.insert(columns.id.clone(), RawValue::from(record.id.clone()));
    }
    for field in TextField::ALL {
        if schema.has(field) {
            row.insert(
                columns.column(field.into()).to_string(),
                RawValue::String(record.text(field).to_string()),
            );
        }
    }
    for field in TimeField::ALL {
        if schema.has(field) {
            row.insert(
                columns.column(field.into()).to_string(),
                RawValue::from(record.time(field)),
            );
        }
    }
    row
}

/// Normalize raw rows into ticket records. Pure and deterministic.
pub fn normalize(rows: &[RawRow], columns: &ColumnMap) -> NormalizedBatch {
    let mut schema = Schema::default();
    for row in rows {
        if row.contains_key(&columns.id) {
            schema.mark_id();
        }
        for field in TextField::ALL.map(Field::Text).into_iter().chain(TimeField::ALL.map(Field::Time)) {
            if row.contains_key(columns.column(field)) {
                schema.mark(field);
            }
        }
    }

    let mut stats = NormalizeStats {
        rows: rows.len(),
        ..Default::default()
    };
    let records = rows
        .iter()
        .map(|row| normalize_row(row, columns, &mut stats))
        .collect();

    debug!(
        "Normalized {} rows ({} unparsable timestamps)",
        stats.rows, stats.unparsable_timestamps
    );

    NormalizedBatch {
        records,
        schema,
        stats,
    }
}

/// Normalize a JSON document holding an array of row objects
pub fn normalize_json(value: &serde_json::Value, columns: &ColumnMap) -> NormalizeResult<NormalizedBatch> {
    let rows = rows_from_json(value)?;
    Ok(normalize(&rows, columns))
}

/// Split a JSON array of objects into raw rows
pub fn rows_from_json(value: &serde_json::Value) -> NormalizeResult<Vec<RawRow>> {
    let items = value
        .as_array()
        .ok_or_else(|| NormalizeError::NotATable(json_kind(value)))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| row_from_json(index, item))
        .collect()
}

/// Convert one JSON object into a raw row; `index` is only used in the error
pub fn row_from_json(index: usize, item: &serde_json::Value) -> NormalizeResult<RawRow> {
    let obj = item.as_object().ok_or(NormalizeError::NotARow {
        index,
        found: json_kind(item),
    })?;
    Ok(obj
        .iter()
        .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
        .collect())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn normalize_row(row: &RawRow, columns: &ColumnMap, stats: &mut NormalizeStats) -> TicketRecord {
    let text = |field: TextField| {
        row.get(columns.column(field.into()))
            .map(text_value)
            .unwrap_or_default()
    };
    let mut time = |field: TimeField| {
        let raw = row.get(columns.column(field.into()))?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() && !is_blank(raw) {
            stats.unparsable_timestamps += 1;
        }
        parsed
    };

    TicketRecord {
        id: row
            .get(&columns.id)
            .map(text_value)
            .filter(|id| !id.is_empty()),
        opened_at: time(TimeField::OpenedAt),
        last_modified_at: time(TimeField::LastModifiedAt),
        closed_at: time(TimeField::ClosedAt),
        requester: text(TextField::Requester),
        status: text(TextField::Status),
        service_name: text(TextField::ServiceName),
        contract_number: text(TextField::ContractNumber),
        extra: row
            .iter()
            .filter(|(column, _)| !columns.is_mapped(column))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect(),
    }
}

fn is_blank(raw: &RawValue) -> bool {
    match raw {
        RawValue::Null => true,
        RawValue::String(s) => clean_text(s).is_empty(),
        RawValue::Float(f) => f.is_nan(),
        _ => false,
    }
}

fn numeric_artifact() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([+-]?\d+)\.0$").expect("static regex"))
}

/// Render any cell as a normalized string
pub fn text_value(raw: &RawValue) -> String {
    match raw {
        RawValue::Null => MISSING.to_string(),
        RawValue::String(s) => clean_text(s),
        RawValue::Integer(i) => i.to_string(),
        RawValue::Float(f) if !f.is_finite() => MISSING.to_string(),
        RawValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        RawValue::Float(f) => clean_text(&f.to_string()),
        RawValue::Boolean(b) => b.to_string(),
        RawValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Trim, collapse inner whitespace, map null tokens to the placeholder and
/// strip the `.0` left behind by numbers that went through a float column
pub fn clean_text(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if NULL_TOKENS.iter().any(|t| collapsed.eq_ignore_ascii_case(t)) {
        return MISSING.to_string();
    }
    match numeric_artifact().captures(&collapsed) {
        Some(caps) => caps[1].to_string(),
        None => collapsed,
    }
}

/// Tolerant timestamp parser; `None` for anything it does not recognize
pub fn parse_timestamp(raw: &RawValue) -> Option<NaiveDateTime> {
    match raw {
        RawValue::Timestamp(ts) => Some(*ts),
        RawValue::Integer(ms) => DateTime::<Utc>::from_timestamp_millis(*ms).map(|dt| dt.naive_utc()),
        RawValue::Float(ms) if ms.is_finite() => {
            DateTime::<Utc>::from_timestamp_millis(*ms as i64).map(|dt| dt.naive_utc())
        }
        RawValue::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
