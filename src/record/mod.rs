//! Ticket data model
//!
//! Raw rows come from the ticket store as loosely typed maps. This module
//! turns them into canonical [`TicketRecord`]s, tracks which canonical fields
//! a snapshot actually carries, and hands out borrowed views for the engines.

pub mod field;
pub mod normalize;
pub mod ticket;
pub mod value;

// Re-export main types
pub use field::{ColumnMap, Field, FieldUnavailable, Schema, TextField, TimeField};
pub use normalize::{
    normalize, normalize_json, row_from_json, rows_from_json, NormalizeError, NormalizeResult, NormalizeStats, NormalizedBatch,
};
pub use ticket::{TicketRecord, TicketSnapshot, TicketView};
pub use value::{RawRow, RawValue};
