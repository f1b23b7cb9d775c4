use chrono::NaiveDate;
use citsm::record::{normalize, normalize_json, ColumnMap, NormalizeError, RawRow, RawValue};
use citsm::{top_n_counts, CategoryCount, TextField, TimeField};
use serde_json::json;

fn messy_rows() -> Vec<RawRow> {
    let cells: Vec<(&str, RawValue)> = vec![
        ("DTABERTURA", RawValue::from("2025-01-02T08:30:00")),
        ("DTFIM", RawValue::from("NaT")),
        ("DTULTIMAMODIFICACAO", RawValue::Integer(1_735_812_000_000)),
        ("DEMANDANTE", RawValue::from("  Maria   da  Silva ")),
        ("STATUS", RawValue::from("None")),
        ("NOMESERVICO", RawValue::from("Sustentação")),
        ("NUMEROCONTRATO", RawValue::Float(12.0)),
        ("TICKET_PRINCIPAL", RawValue::from("77.0")),
        ("PRIORIDADE", RawValue::from("alta")),
    ];
    let first: RawRow = cells.into_iter().map(|(k, v)| (k.to_string(), v)).collect();

    let mut second = RawRow::new();
    second.insert("DTABERTURA".into(), RawValue::from("31/12/2024"));
    second.insert("DEMANDANTE".into(), RawValue::Null);
    second.insert("NUMEROCONTRATO".into(), RawValue::from("abc"));
    vec![first, second]
}

#[test]
fn test_normalization_is_idempotent() {
    let columns = ColumnMap::default();
    let once = normalize(&messy_rows(), &columns);
    let twice = normalize(&once.to_raw_rows(&columns), &columns);

    assert_eq!(once.records, twice.records);
    assert_eq!(once.schema, twice.schema);
}

#[test]
fn test_messy_values() {
    let batch = normalize(&messy_rows(), &ColumnMap::default());
    let first = &batch.records[0];

    assert_eq!(first.requester, "Maria da Silva");
    assert_eq!(first.status, "");
    assert_eq!(first.contract_number, "12");
    assert_eq!(first.id.as_deref(), Some("77"));
    assert_eq!(first.closed_at, None);
    assert_eq!(
        first.opened_at,
        NaiveDate::from_ymd_opt(2025, 1, 2).and_then(|d| d.and_hms_opt(8, 30, 0))
    );
    // 2025-01-02T10:00:00Z as epoch milliseconds
    assert_eq!(
        first.last_modified_at,
        NaiveDate::from_ymd_opt(2025, 1, 2).and_then(|d| d.and_hms_opt(10, 0, 0))
    );
    assert_eq!(first.extra.get("PRIORIDADE"), Some(&RawValue::from("alta")));

    let second = &batch.records[1];
    assert_eq!(second.opened_at.map(|ts| ts.date()), NaiveDate::from_ymd_opt(2024, 12, 31));
    assert_eq!(second.requester, "");
    assert_eq!(second.contract_number, "abc");

    assert!(batch.schema.has(TimeField::ClosedAt));
    assert!(batch.schema.has(TextField::ContractNumber));
}

#[test]
fn test_json_input_must_be_a_table() {
    let columns = ColumnMap::default();
    assert_eq!(
        normalize_json(&json!({"rows": []}), &columns).unwrap_err(),
        NormalizeError::NotATable("object")
    );
    assert_eq!(
        normalize_json(&json!([{"STATUS": "Aberto"}, 3]), &columns).unwrap_err(),
        NormalizeError::NotARow {
            index: 1,
            found: "number"
        }
    );
    let empty = normalize_json(&json!([]), &columns).unwrap();
    assert!(empty.records.is_empty());
}

#[test]
fn test_top_n_is_stable() {
    let rows: Vec<RawRow> = ["A", "A", "B", "B", "B", "C"]
        .iter()
        .map(|r| {
            let mut row = RawRow::new();
            row.insert("DEMANDANTE".into(), RawValue::from(*r));
            row
        })
        .collect();
    let snapshot = normalize(&rows, &ColumnMap::default()).into_snapshot();

    let top = top_n_counts(&snapshot.view(), TextField::Requester, 2).unwrap();
    assert_eq!(top, vec![CategoryCount::new("B", 3), CategoryCount::new("A", 2)]);

    let all = top_n_counts(&snapshot.view(), TextField::Requester, 10).unwrap();
    assert_eq!(all.len(), 3);
    assert!(top_n_counts(&snapshot.view(), TextField::Status, 2).is_err());
}
