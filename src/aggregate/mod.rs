//! Aggregation engine
//!
//! Count distributions (top-N requesters, status breakdown), KPI totals and
//! time-bucketed series computed from a [`TicketView`](crate::record::TicketView).
//! Missing fields surface as [`FieldUnavailable`](crate::record::FieldUnavailable)
//! or as omitted metrics; empty views produce empty results.

pub mod counts;
pub mod kpi;
pub mod timeseries;

pub use counts::{status_distribution, top_n_counts, total, CategoryCount};
pub use kpi::{kpi_summary, KpiSummary};
pub use timeseries::{build_timeseries, BucketRule, MetricSpec, TimeSeriesBucket, Timeline, TimelineRow};
