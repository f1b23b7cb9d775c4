//! Backlog aging: open tickets ranked by time since opening

use crate::record::{FieldUnavailable, TicketView, TimeField};
use chrono::NaiveDateTime;
use serde::Serialize;

const SECONDS_PER_DAY: i64 = 86_400;

/// One open ticket and how long it has been open
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgingEntry {
    pub id: Option<String>,
    pub requester: String,
    pub status: String,
    pub opened_at: NaiveDateTime,
    pub age_days: i64,
}

/// Gantt bar from opening until `now`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GanttBar {
    pub label: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: String,
}

/// Whole days between `opened_at` and `now`, floored
pub fn age_days(opened_at: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (now - opened_at).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// The `top_k` oldest open tickets
///
/// Only tickets without `closed_at` and with an `opened_at` are considered.
/// Ordered by age descending, ties by requester ascending.
pub fn aging_report(
    view: &TicketView<'_>,
    now: NaiveDateTime,
    top_k: usize,
) -> Result<Vec<AgingEntry>, FieldUnavailable> {
    let schema = view.schema();
    schema.require(TimeField::OpenedAt)?;
    schema.require(TimeField::ClosedAt)?;

    let mut entries: Vec<AgingEntry> = view
        .iter()
        .filter(|r| r.is_open())
        .filter_map(|r| {
            let opened_at = r.opened_at?;
            Some(AgingEntry {
                id: r.id.clone(),
                requester: r.requester.clone(),
                status: r.status.clone(),
                opened_at,
                age_days: age_days(opened_at, now),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.age_days
            .cmp(&a.age_days)
            .then_with(|| a.requester.cmp(&b.requester))
    });
    entries.truncate(top_k);
    Ok(entries)
}

/// Bars for the aging Gantt, oldest first, labelled `"<requester> (<N>d)"`
pub fn gantt_rows(entries: &[AgingEntry], now: NaiveDateTime) -> Vec<GanttBar> {
    entries
        .iter()
        .map(|e| GanttBar {
            label: format!("{} ({}d)", e.requester, e.age_days),
            start: e.opened_at,
            end: now,
            status: e.status.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, Schema, TicketRecord, TicketSnapshot};
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn ticket(requester: &str, opened_days_ago: Option<i64>, closed: bool) -> TicketRecord {
        let mut r = TicketRecord::blank();
        r.requester = requester.to_string();
        r.status = "Em Andamento".to_string();
        r.opened_at = opened_days_ago.map(|d| now() - Duration::days(d));
        if closed {
            r.closed_at = Some(now());
        }
        r
    }

    #[test]
    fn test_age_is_floored() {
        let opened = now() - Duration::days(10);
        assert_eq!(age_days(opened, now()), 10);
        assert_eq!(age_days(opened + Duration::hours(1), now()), 9);
        assert_eq!(age_days(now() + Duration::hours(1), now()), -1);
    }

    #[test]
    fn test_aging_excludes_closed_and_undated() {
        let snap = TicketSnapshot::new(
            vec![
                ticket("ana", Some(10), false),
                ticket("bia", Some(40), true),
                ticket("caio", None, false),
            ],
            Schema::complete(),
        );
        let report = aging_report(&snap.view(), now(), 15).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].requester, "ana");
        assert_eq!(report[0].age_days, 10);
    }

    #[test]
    fn test_aging_order_and_limit() {
        let snap = TicketSnapshot::new(
            vec![
                ticket("zé", Some(5), false),
                ticket("bia", Some(30), false),
                ticket("ana", Some(30), false),
                ticket("caio", Some(12), false),
            ],
            Schema::complete(),
        );
        let report = aging_report(&snap.view(), now(), 3).unwrap();
        let order: Vec<(&str, i64)> = report.iter().map(|e| (e.requester.as_str(), e.age_days)).collect();

        assert_eq!(order, vec![("ana", 30), ("bia", 30), ("caio", 12)]);
    }

    #[test]
    fn test_gantt_labels() {
        let snap = TicketSnapshot::new(vec![ticket("ana", Some(7), false)], Schema::complete());
        let report = aging_report(&snap.view(), now(), 15).unwrap();
        let bars = gantt_rows(&report, now());

        assert_eq!(bars[0].label, "ana (7d)");
        assert_eq!(bars[0].end, now());
        assert_eq!(bars[0].start, now() - Duration::days(7));
    }

    #[test]
    fn test_aging_requires_closing_field() {
        let mut schema = Schema::default();
        schema.mark(TimeField::OpenedAt.into());
        let snap = TicketSnapshot::new(vec![ticket("ana", Some(1), false)], schema);

        assert_eq!(
            aging_report(&snap.view(), now(), 15),
            Err(FieldUnavailable(Field::Time(TimeField::ClosedAt)))
        );
    }
}
