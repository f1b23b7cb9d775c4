use chrono::NaiveDate;
use citsm::cascade::{
    AdjustmentReason, Fallback, StageStatus, PERIOD_STAGE, REQUESTER_STAGE, SERVICE_STAGE,
    STATUS_STAGE,
};
use citsm::record::{normalize, ColumnMap, RawRow, RawValue, Schema};
use citsm::{
    apply_stages, status_distribution, total, CascadePlan, DateRange, FilterStage, Predicate,
    TextField, TicketSnapshot, TimeField,
};

fn row(service: &str, requester: &str, status: &str, opened: &str) -> RawRow {
    let mut row = RawRow::new();
    row.insert("NOMESERVICO".into(), RawValue::from(service));
    row.insert("DEMANDANTE".into(), RawValue::from(requester));
    row.insert("STATUS".into(), RawValue::from(status));
    row.insert("DTABERTURA".into(), RawValue::from(opened));
    row.insert("DTFIM".into(), RawValue::Null);
    row
}

fn five_records() -> TicketSnapshot {
    let rows = vec![
        row("Sustentação", "ana", "Em Andamento", "2025-01-02 08:00:00"),
        row("Sustentação", "bia", "Fechado", "2025-01-10 08:00:00"),
        row("Outro", "caio", "Em Andamento", "2025-01-11 08:00:00"),
        row("Sustentação", "ana", "Fechado", "2025-02-03 08:00:00"),
        row("Outro", "bia", "Aguardando", "03/02/2025 10:15"),
    ];
    normalize(&rows, &ColumnMap::default()).into_snapshot()
}

fn dashboard_stages() -> Vec<FilterStage> {
    vec![
        FilterStage::date_range(PERIOD_STAGE, TimeField::OpenedAt)
            .with_fallback(Fallback::FirstAvailable),
        FilterStage::equals(SERVICE_STAGE, TextField::ServiceName)
            .with_fallback(Fallback::Preferred("Sustenta".into())),
        FilterStage::equals(REQUESTER_STAGE, TextField::Requester),
        FilterStage::equals(STATUS_STAGE, TextField::Status),
    ]
}

#[test]
fn test_service_scenario() {
    let snap = five_records();
    assert_eq!(snap.len(), 5);

    let stages = vec![FilterStage::equals(SERVICE_STAGE, TextField::ServiceName)
        .with_value(Some(Predicate::Equals("Sustentação".into())))];
    let outcome = apply_stages(&snap.view(), &stages);

    let survivors = outcome.final_view();
    assert_eq!(survivors.len(), 3);
    let distribution = status_distribution(&survivors).unwrap();
    assert_eq!(total(&distribution), 3);
}

#[test]
fn test_default_service_is_configuration() {
    let snap = five_records();
    let plan = CascadePlan::new(dashboard_stages()).unwrap();
    let outcome = plan.apply(&snap.view());

    let service = outcome.report(SERVICE_STAGE).unwrap();
    assert_eq!(service.applied, Some(Predicate::Equals("Sustentação".into())));
    assert_eq!(service.adjustment.as_ref().unwrap().reason, AdjustmentReason::Defaulted);
    assert_eq!(outcome.final_view().len(), 3);

    // the period default spans every available date
    let period = outcome.report(PERIOD_STAGE).unwrap();
    assert_eq!(
        period.applied,
        Some(Predicate::DateRange(DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
        )))
    );
}

#[test]
fn test_monotonic_narrowing() {
    let snap = five_records();
    let selections = [
        (SERVICE_STAGE, Predicate::Equals("Sustentação".into())),
        (REQUESTER_STAGE, Predicate::Equals("ana".into())),
        (STATUS_STAGE, Predicate::Equals("Fechado".into())),
    ];
    let stages: Vec<FilterStage> = dashboard_stages()
        .into_iter()
        .map(|stage| {
            let value = selections
                .iter()
                .find(|(id, _)| *id == stage.id())
                .map(|(_, p)| p.clone());
            stage.with_value(value)
        })
        .collect();
    let outcome = apply_stages(&snap.view(), &stages);

    let mut previous = snap.len();
    for report in outcome.reports() {
        assert!(report.surviving <= previous, "stage {} grew", report.id);
        previous = report.surviving;
    }
    assert_eq!(outcome.final_view().len(), 1);
}

#[test]
fn test_options_ignore_later_stages() {
    let snap = five_records();
    let base = apply_stages(&snap.view(), &dashboard_stages());

    let mut narrowed = dashboard_stages();
    narrowed[2].set_value(Some(Predicate::Equals("bia".into())));
    narrowed[3].set_value(Some(Predicate::Equals("Fechado".into())));
    let changed = apply_stages(&snap.view(), &narrowed);

    for id in [PERIOD_STAGE, SERVICE_STAGE, REQUESTER_STAGE] {
        assert_eq!(base.options(id), changed.options(id), "options of {} moved", id);
    }
    assert_eq!(
        changed.options(REQUESTER_STAGE).unwrap().as_text(),
        &["ana".to_string(), "bia".to_string()]
    );
    assert_eq!(changed.options(STATUS_STAGE).unwrap().as_text(), &["Fechado".to_string()]);
}

#[test]
fn test_stale_requester_resets() {
    let snap = five_records();
    let mut stages = dashboard_stages();
    // caio only exists under "Outro"
    stages[2].set_value(Some(Predicate::Equals("caio".into())));
    let outcome = apply_stages(&snap.view(), &stages);

    let requester = outcome.report(REQUESTER_STAGE).unwrap();
    assert_eq!(requester.applied, None);
    assert_eq!(requester.status, StageStatus::PassThrough);
    let adjustment = requester.adjustment.as_ref().unwrap();
    assert_eq!(adjustment.reason, AdjustmentReason::Stale);
    assert_eq!(adjustment.previous, Some(Predicate::Equals("caio".into())));
    assert_eq!(outcome.final_view().len(), 3);
}

#[test]
fn test_empty_survivors_short_circuit() {
    let snap = five_records();
    let stages = vec![
        FilterStage::date_range(PERIOD_STAGE, TimeField::OpenedAt).with_value(Some(
            Predicate::DateRange(DateRange::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            )),
        )),
        FilterStage::equals(SERVICE_STAGE, TextField::ServiceName)
            .with_value(Some(Predicate::Equals("Sustentação".into()))),
    ];
    let outcome = apply_stages(&snap.view(), &stages);

    // a range entirely outside the data falls back to pass-through
    let period = outcome.report(PERIOD_STAGE).unwrap();
    assert_eq!(period.adjustment.as_ref().unwrap().reason, AdjustmentReason::Stale);
    assert_eq!(outcome.final_view().len(), 3);

    let empty = TicketSnapshot::new(Vec::new(), Schema::complete());
    let outcome = apply_stages(&empty.view(), &stages);
    let service = outcome.report(SERVICE_STAGE).unwrap();
    assert_eq!(service.status, StageStatus::ShortCircuited);
    assert_eq!(service.applied, Some(Predicate::Equals("Sustentação".into())));
    assert!(service.options.is_empty());
}
