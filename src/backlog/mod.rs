//! Backlog aging engine
//!
//! Unresolved tickets ranked by elapsed time since creation, plus the bars
//! for the "oldest pending tickets" Gantt.

pub mod aging;

pub use aging::{age_days, aging_report, gantt_rows, AgingEntry, GanttBar};
