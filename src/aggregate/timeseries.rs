//! Resampled multi-series timeline (opened / modified / closed per period)

use crate::record::{TicketView, TimeField};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Time granularity used to group events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketRule {
    #[serde(alias = "day")]
    Daily,
    /// Weeks anchored on Monday; each bucket is keyed by the Monday on or
    /// after the event date (pandas `W-MON` labelling)
    #[default]
    #[serde(alias = "weekly")]
    WeeklyMondayStart,
    /// Keyed by the first day of the month
    #[serde(alias = "month")]
    Monthly,
}

impl BucketRule {
    /// Bucket key for a calendar date, `None` when the key falls past the
    /// last representable date
    pub fn bucket_of(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            BucketRule::Daily => Some(date),
            BucketRule::WeeklyMondayStart => {
                let ahead = (7 - date.weekday().num_days_from_monday()) % 7;
                date.checked_add_days(Days::new(ahead as u64))
            }
            BucketRule::Monthly => date.with_day(1),
        }
    }

    /// Key of the bucket following `bucket`
    pub fn next(&self, bucket: NaiveDate) -> Option<NaiveDate> {
        match self {
            BucketRule::Daily => bucket.checked_add_days(Days::new(1)),
            BucketRule::WeeklyMondayStart => bucket.checked_add_days(Days::new(7)),
            BucketRule::Monthly => {
                let (year, month) = if bucket.month() == 12 {
                    (bucket.year().checked_add(1)?, 1)
                } else {
                    (bucket.year(), bucket.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
            }
        }
    }
}

impl fmt::Display for BucketRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BucketRule::Daily => "daily",
            BucketRule::WeeklyMondayStart => "weekly",
            BucketRule::Monthly => "monthly",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BucketRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "day" | "d" | "diario" | "diário" => Ok(BucketRule::Daily),
            "weekly" | "week" | "weekly_monday_start" | "w-mon" | "semanal" => {
                Ok(BucketRule::WeeklyMondayStart)
            }
            "monthly" | "month" | "ms" | "mensal" => Ok(BucketRule::Monthly),
            other => Err(format!("unknown bucket rule: {}", other)),
        }
    }
}

/// One line of the timeline: which timestamp it counts and its legend name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub field: TimeField,
    pub name: String,
}

impl MetricSpec {
    pub fn new(field: TimeField, name: impl Into<String>) -> Self {
        Self {
            field,
            name: name.into(),
        }
    }

    /// Opened / modified / closed, with the dashboard's legend names
    pub fn defaults() -> Vec<MetricSpec> {
        vec![
            MetricSpec::new(TimeField::OpenedAt, "Abertos"),
            MetricSpec::new(TimeField::LastModifiedAt, "Modificados"),
            MetricSpec::new(TimeField::ClosedAt, "Fechados"),
        ]
    }
}

/// Long-form bucket: `(period_start, metric, count)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesBucket<'a> {
    pub period_start: NaiveDate,
    pub metric: &'a str,
    pub count: u64,
}

/// Wide-form row: one count per metric, aligned with [`Timeline::metrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineRow {
    pub period_start: NaiveDate,
    pub counts: Vec<u64>,
}

/// Bucketed counts for every available metric over one gap-free span
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub rule: BucketRule,
    pub metrics: Vec<String>,
    pub rows: Vec<TimelineRow>,
    /// Requested fields the snapshot does not carry
    pub unavailable: Vec<TimeField>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate in long form, ordered by period then metric
    pub fn buckets(&self) -> impl Iterator<Item = TimeSeriesBucket<'_>> {
        self.rows.iter().flat_map(move |row| {
            self.metrics
                .iter()
                .zip(&row.counts)
                .map(move |(metric, count)| TimeSeriesBucket {
                    period_start: row.period_start,
                    metric: metric.as_str(),
                    count: *count,
                })
        })
    }

    /// Points of a single metric
    pub fn series(&self, metric: &str) -> Option<Vec<(NaiveDate, u64)>> {
        let idx = self.metrics.iter().position(|m| m == metric)?;
        Some(self.rows.iter().map(|r| (r.period_start, r.counts[idx])).collect())
    }

    pub fn total(&self, metric: &str) -> Option<u64> {
        self.series(metric).map(|s| s.iter().map(|(_, c)| c).sum())
    }
}

/// Count non-null timestamps per bucket for each metric
///
/// Rows cover every bucket from the earliest to the latest one across all
/// metrics; periods without activity carry 0. Metrics whose field is missing
/// from the schema are left out and listed in [`Timeline::unavailable`].
pub fn build_timeseries(view: &TicketView<'_>, metrics: &[MetricSpec], rule: BucketRule) -> Timeline {
    let schema = view.schema();
    let (available, missing): (Vec<&MetricSpec>, Vec<&MetricSpec>) =
        metrics.iter().partition(|m| schema.has(m.field));

    let per_metric: Vec<BTreeMap<NaiveDate, u64>> = available
        .iter()
        .map(|metric| {
            let mut counts = BTreeMap::new();
            let mut dropped = 0usize;
            for ts in view.iter().filter_map(|r| r.time(metric.field)) {
                match rule.bucket_of(ts.date()) {
                    Some(bucket) => *counts.entry(bucket).or_insert(0) += 1,
                    None => dropped += 1,
                }
            }
            if dropped > 0 {
                debug!("{}: {} timestamp(s) past the last {} bucket", metric.name, dropped, rule);
            }
            counts
        })
        .collect();

    let first = per_metric.iter().filter_map(|c| c.keys().next()).min().copied();
    let last = per_metric.iter().filter_map(|c| c.keys().next_back()).max().copied();

    let mut rows = Vec::new();
    if let (Some(first), Some(last)) = (first, last) {
        let mut period = Some(first);
        while let Some(period_start) = period.filter(|p| *p <= last) {
            rows.push(TimelineRow {
                period_start,
                counts: per_metric
                    .iter()
                    .map(|c| c.get(&period_start).copied().unwrap_or(0))
                    .collect(),
            });
            period = rule.next(period_start);
        }
    }

    debug!(
        "Timeline ({}): {} metrics, {} buckets, {} unavailable",
        rule,
        available.len(),
        rows.len(),
        missing.len()
    );

    Timeline {
        rule,
        metrics: available.iter().map(|m| m.name.clone()).collect(),
        rows,
        unavailable: missing.iter().map(|m| m.field).collect(),
    }
}
