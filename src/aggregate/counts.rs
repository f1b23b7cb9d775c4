//! Category counts for bar and pie charts

use crate::record::{FieldUnavailable, TextField, TicketView};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::Serialize;

/// One bar/slice: a category value and how many records carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

impl CategoryCount {
    pub fn new(value: impl Into<String>, count: usize) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }

    /// Percentage of `total`, rounded to one decimal
    pub fn share(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (self.count as f64 / total as f64 * 1000.0).round() / 10.0
        }
    }
}

/// The `n` most frequent values of `field`
///
/// Counting keeps first-seen order and the sort by count is stable, so ties
/// come out in the order they first appeared in `view`.
pub fn top_n_counts(
    view: &TicketView<'_>,
    field: TextField,
    n: usize,
) -> Result<Vec<CategoryCount>, FieldUnavailable> {
    view.schema().require(field)?;

    let mut counts: IndexMap<&str, usize, FxBuildHasher> = IndexMap::default();
    for record in view.iter() {
        *counts.entry(record.text(field)).or_insert(0) += 1;
    }

    let mut ranked: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(value, count)| CategoryCount::new(value, count))
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    Ok(ranked)
}

/// Every status with its count, most frequent first
pub fn status_distribution(view: &TicketView<'_>) -> Result<Vec<CategoryCount>, FieldUnavailable> {
    top_n_counts(view, TextField::Status, usize::MAX)
}

/// Sum of all counts
pub fn total(counts: &[CategoryCount]) -> usize {
    counts.iter().map(|c| c.count).sum()
}
