//! Filter stage definitions
//!
//! A stage is a predicate over one canonical field. The predicate is optional:
//! an unset stage either passes everything through or resolves a default from
//! its own option list, depending on its [`Fallback`].

use super::{CascadeError, CascadeResult};
use crate::record::{Field, TextField, TicketRecord, TimeField};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Comparison kind declared by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equals,
    InSet,
    DateRange,
}

impl Comparison {
    /// Whether this comparison can be evaluated against `field`
    pub fn accepts(&self, field: Field) -> bool {
        match self {
            Comparison::Equals | Comparison::InSet => !field.is_temporal(),
            Comparison::DateRange => field.is_temporal(),
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// January 1st through December 31st of `year`
    pub fn year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Intersection with `bounds`; `None` when they do not overlap
    pub fn clamp(&self, bounds: &DateRange) -> Option<DateRange> {
        let clamped = DateRange {
            start: self.start.max(bounds.start),
            end: self.end.min(bounds.end),
        };
        (self.is_valid() && clamped.is_valid()).then_some(clamped)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Accepted value of a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Equals(String),
    InSet(BTreeSet<String>),
    DateRange(DateRange),
}

impl Predicate {
    pub fn kind(&self) -> Comparison {
        match self {
            Predicate::Equals(_) => Comparison::Equals,
            Predicate::InSet(_) => Comparison::InSet,
            Predicate::DateRange(_) => Comparison::DateRange,
        }
    }

    pub fn in_set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::InSet(values.into_iter().map(Into::into).collect())
    }

    /// Evaluate against one record. Null timestamps never match a date range.
    pub fn matches(&self, record: &TicketRecord, field: Field) -> bool {
        match (self, field) {
            (Predicate::Equals(v), Field::Text(f)) => record.text(f) == v,
            (Predicate::InSet(set), Field::Text(f)) => set.contains(record.text(f)),
            (Predicate::DateRange(range), Field::Time(f)) => record
                .time(f)
                .map(|ts| range.contains(ts.date()))
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals(v) => write!(f, "{}", v),
            Predicate::InSet(set) => {
                let items: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Predicate::DateRange(range) => write!(f, "{}", range),
        }
    }
}

/// What an unset or stale stage resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Stay unset: the stage lets every record through
    PassThrough,
    /// First option in sort order; for date ranges the full available span
    FirstAvailable,
    /// First option containing the given substring, else the first option
    Preferred(String),
}

/// One step of the cascade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStage {
    id: String,
    field: Field,
    kind: Comparison,
    value: Option<Predicate>,
    fallback: Fallback,
}

impl FilterStage {
    /// Create a stage, rejecting comparisons the field cannot support
    pub fn new(id: impl Into<String>, field: Field, kind: Comparison) -> CascadeResult<Self> {
        let id = id.into();
        if !kind.accepts(field) {
            return Err(CascadeError::InvalidStage { id, field, kind });
        }
        Ok(Self {
            id,
            field,
            kind,
            value: None,
            fallback: Fallback::PassThrough,
        })
    }

    pub fn equals(id: impl Into<String>, field: TextField) -> Self {
        Self {
            id: id.into(),
            field: field.into(),
            kind: Comparison::Equals,
            value: None,
            fallback: Fallback::PassThrough,
        }
    }

    pub fn in_set(id: impl Into<String>, field: TextField) -> Self {
        Self {
            kind: Comparison::InSet,
            ..Self::equals(id, field)
        }
    }

    pub fn date_range(id: impl Into<String>, field: TimeField) -> Self {
        Self {
            id: id.into(),
            field: field.into(),
            kind: Comparison::DateRange,
            value: None,
            fallback: Fallback::PassThrough,
        }
    }

    pub fn with_value(mut self, value: Option<Predicate>) -> Self {
        self.value = value;
        self
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn set_value(&mut self, value: Option<Predicate>) {
        self.value = value;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn kind(&self) -> Comparison {
        self.kind
    }

    pub fn value(&self) -> Option<&Predicate> {
        self.value.as_ref()
    }

    pub fn fallback(&self) -> &Fallback {
        &self.fallback
    }

    /// Unset stages that pass everything through can be skipped by callers
    pub fn is_optional(&self) -> bool {
        self.fallback == Fallback::PassThrough
    }
}
