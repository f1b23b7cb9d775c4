//! CITSM Ticket Analytics
//!
//! The analytics core behind the ITSM ticket dashboards: KPI panels,
//! cross-filtered charts (requesters bar chart feeding a status chart feeding
//! a detail table), a multi-series work-rhythm timeline and a backlog aging
//! view.
//!
//! # Architecture
//!
//! Leaf-first:
//!
//! - [`source`]: where raw rows come from ([`TicketSource`], JSON files, TTL cache)
//! - [`record`]: normalization of loosely typed rows into [`TicketRecord`]s
//! - [`cascade`]: period → contract → service → requester → status filter chain
//! - [`aggregate`]: top-N counts, status distribution, timelines, KPI totals
//! - [`backlog`]: aging report and Gantt bars for unresolved tickets
//! - [`dashboard`]: configuration and the full render pipeline
//!
//! Everything downstream of the source is synchronous and pure: a render pass
//! is a function of the snapshot, the user's [`Selections`] and `now`.
//!
//! ## Example Usage
//!
//! ```rust
//! use citsm::record::{normalize, ColumnMap, RawRow, RawValue};
//! use citsm::{Dashboard, DashboardConfig, Selections};
//! use chrono::NaiveDate;
//!
//! let mut row = RawRow::new();
//! row.insert("DTABERTURA".into(), RawValue::from("2025-01-02 09:30:00"));
//! row.insert("DTFIM".into(), RawValue::Null);
//! row.insert("DEMANDANTE".into(), RawValue::from("Ana"));
//! row.insert("STATUS".into(), RawValue::from("Em Andamento"));
//! row.insert("NOMESERVICO".into(), RawValue::from("Sustentação"));
//!
//! let config = DashboardConfig::default();
//! let snapshot = normalize(&[row], &config.columns).into_snapshot();
//! let dashboard = Dashboard::new(config).unwrap();
//!
//! let now = NaiveDate::from_ymd_opt(2025, 1, 12).unwrap().and_hms_opt(9, 30, 0).unwrap();
//! let views = dashboard.render(&snapshot, &Selections::new(), now);
//!
//! assert_eq!(views.kpis.total, 1);
//! assert_eq!(views.gantt.ready().unwrap()[0].label, "Ana (10d)");
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod backlog;
pub mod cascade;
pub mod dashboard;
pub mod record;
pub mod source;

// Re-export main types for convenience
pub use record::{
    normalize, normalize_json, ColumnMap, Field, FieldUnavailable, NormalizeError,
    NormalizeResult, NormalizedBatch, RawRow, RawValue, Schema, TextField, TicketRecord,
    TicketSnapshot, TicketView, TimeField,
};

pub use cascade::{
    apply_stages, CascadeError, CascadeOutcome, CascadePlan, CascadeResult, ChartId, DateRange,
    FilterStage, InteractionEvent, InteractionState, Predicate, Selections, StageReport,
};

pub use aggregate::{
    build_timeseries, kpi_summary, status_distribution, top_n_counts, total, BucketRule, CategoryCount,
    KpiSummary, MetricSpec, Timeline,
};

pub use backlog::{aging_report, gantt_rows, AgingEntry, GanttBar};

pub use dashboard::{
    ConfigError, ConfigResult, Dashboard, DashboardConfig, DashboardViews, Panel, TablePage,
};

pub use source::{CachedSource, JsonFileSource, SourceError, SourceResult, TicketSource};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
