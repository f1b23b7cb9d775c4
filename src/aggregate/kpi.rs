//! Headline KPI panel

use crate::record::{TextField, TicketView, TimeField};
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Totals shown above the charts. Counts that depend on a missing field are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KpiSummary {
    pub total: usize,
    pub open: Option<usize>,
    pub closed: Option<usize>,
    pub distinct_requesters: Option<usize>,
    pub distinct_services: Option<usize>,
    pub distinct_contracts: Option<usize>,
}

pub fn kpi_summary(view: &TicketView<'_>) -> KpiSummary {
    let schema = view.schema();
    let distinct = |field: TextField| {
        schema.has(field).then(|| {
            view.iter()
                .map(|r| r.text(field))
                .filter(|v| !v.is_empty())
                .collect::<FxHashSet<&str>>()
                .len()
        })
    };
    let open = schema
        .has(TimeField::ClosedAt)
        .then(|| view.iter().filter(|r| r.is_open()).count());

    KpiSummary {
        total: view.len(),
        open,
        closed: open.map(|open| view.len() - open),
        distinct_requesters: distinct(TextField::Requester),
        distinct_services: distinct(TextField::ServiceName),
        distinct_contracts: distinct(TextField::ContractNumber),
    }
}
