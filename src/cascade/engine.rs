//! Cascade evaluation
//!
//! Stages run strictly left to right. Stage *i* sees only the survivors of
//! stages `0..i`, and its option list is computed from those survivors before
//! its own predicate is applied. Nothing here returns an error: stale values,
//! missing fields and empty intermediate results are all reported in the
//! [`CascadeOutcome`].

use super::stage::{Comparison, DateRange, Fallback, FilterStage, Predicate};
use crate::record::{Field, TicketRecord, TicketView};
use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::debug;

/// Candidate values of a stage, sorted ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum StageOptions {
    Text(Vec<String>),
    Dates(Vec<NaiveDate>),
}

impl StageOptions {
    fn empty_for(field: Field) -> Self {
        if field.is_temporal() {
            StageOptions::Dates(Vec::new())
        } else {
            StageOptions::Text(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StageOptions::Text(v) => v.len(),
            StageOptions::Dates(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> &[String] {
        match self {
            StageOptions::Text(v) => v,
            StageOptions::Dates(_) => &[],
        }
    }

    pub fn contains_text(&self, value: &str) -> bool {
        self.as_text()
            .binary_search_by(|probe| probe.as_str().cmp(value))
            .is_ok()
    }

    /// Earliest and latest date, for date-range pickers
    pub fn bounds(&self) -> Option<DateRange> {
        match self {
            StageOptions::Dates(v) => Some(DateRange::new(*v.first()?, *v.last()?)),
            StageOptions::Text(_) => None,
        }
    }
}

/// How a stage took part in the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// A predicate was applied
    Applied,
    /// No predicate; every record passed
    PassThrough,
    /// The snapshot does not carry the stage's field; every record passed.
    /// Takes precedence over `ShortCircuited`
    FieldUnavailable,
    /// Nothing survived an earlier stage
    ShortCircuited,
}

/// Why the applied value differs from the configured one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Unset stage resolved to its default
    Defaulted,
    /// Configured value no longer among the options
    Stale,
    /// Configured value partially outside the options and was narrowed
    Narrowed,
    /// Configured value of the wrong comparison kind
    KindMismatch,
}

/// Observable recomputation of a stage value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageAdjustment {
    pub previous: Option<Predicate>,
    pub applied: Option<Predicate>,
    pub reason: AdjustmentReason,
}

/// Per-stage result of a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub id: String,
    pub field: Field,
    pub options: StageOptions,
    pub applied: Option<Predicate>,
    pub status: StageStatus,
    pub adjustment: Option<StageAdjustment>,
    /// Records left after this stage
    pub surviving: usize,
}

/// Result of running a stage list over a view
#[derive(Debug, Clone)]
pub struct CascadeOutcome<'a> {
    input: TicketView<'a>,
    /// Number of leading stages each input record passed
    depth: Vec<usize>,
    reports: Vec<StageReport>,
}

impl<'a> CascadeOutcome<'a> {
    pub fn reports(&self) -> &[StageReport] {
        &self.reports
    }

    pub fn report(&self, id: &str) -> Option<&StageReport> {
        self.reports.iter().find(|r| r.id == id)
    }

    pub fn options(&self, id: &str) -> Option<&StageOptions> {
        self.report(id).map(|r| &r.options)
    }

    pub fn adjustments(&self) -> impl Iterator<Item = (&str, &StageAdjustment)> {
        self.reports
            .iter()
            .filter_map(|r| r.adjustment.as_ref().map(|a| (r.id.as_str(), a)))
    }

    /// Survivors after the first `stages` stages (0 = the input)
    pub fn records_at(&self, stages: usize) -> TicketView<'a> {
        let records = self
            .input
            .records()
            .iter()
            .zip(&self.depth)
            .filter(|(_, depth)| **depth >= stages)
            .map(|(record, _)| *record)
            .collect();
        TicketView::new(self.input.schema(), records)
    }

    /// Survivors after the stage named `id`, inclusive
    pub fn records_after(&self, id: &str) -> Option<TicketView<'a>> {
        let index = self.reports.iter().position(|r| r.id == id)?;
        Some(self.records_at(index + 1))
    }

    /// Survivors of every stage
    pub fn final_view(&self) -> TicketView<'a> {
        self.records_at(self.reports.len())
    }

    pub fn input(&self) -> &TicketView<'a> {
        &self.input
    }
}

/// Run `stages` over `view` in order
pub fn apply_stages<'a>(view: &TicketView<'a>, stages: &[FilterStage]) -> CascadeOutcome<'a> {
    let records = view.records();
    let schema = view.schema();
    let mut depth = vec![0usize; records.len()];
    let mut current: Vec<usize> = (0..records.len()).collect();
    let mut reports = Vec::with_capacity(stages.len());

    for stage in stages {
        let field = stage.field();

        if !schema.has(field) {
            debug!("Stage '{}' skipped: field {} unavailable", stage.id(), field);
            advance(&mut depth, &current);
            reports.push(StageReport {
                id: stage.id().to_string(),
                field,
                options: StageOptions::empty_for(field),
                applied: None,
                status: StageStatus::FieldUnavailable,
                adjustment: None,
                surviving: current.len(),
            });
            continue;
        }

        if current.is_empty() {
            reports.push(StageReport {
                id: stage.id().to_string(),
                field,
                options: StageOptions::empty_for(field),
                applied: stage.value().cloned(),
                status: StageStatus::ShortCircuited,
                adjustment: None,
                surviving: 0,
            });
            continue;
        }

        let options = collect_options(records, &current, field);
        let (applied, adjustment) = resolve(stage, &options);

        if let Some(adj) = &adjustment {
            debug!(
                "Stage '{}' value adjusted ({:?}): {:?} -> {:?}",
                stage.id(),
                adj.reason,
                adj.previous,
                adj.applied
            );
        }

        let status = match &applied {
            Some(predicate) => {
                current.retain(|&idx| predicate.matches(records[idx], field));
                StageStatus::Applied
            }
            None => StageStatus::PassThrough,
        };
        advance(&mut depth, &current);

        debug!(
            "Stage '{}': {} options, {} records surviving",
            stage.id(),
            options.len(),
            current.len()
        );

        reports.push(StageReport {
            id: stage.id().to_string(),
            field,
            options,
            applied,
            status,
            adjustment,
            surviving: current.len(),
        });
    }

    CascadeOutcome {
        input: view.clone(),
        depth,
        reports,
    }
}

fn advance(depth: &mut [usize], survivors: &[usize]) {
    for &idx in survivors {
        depth[idx] += 1;
    }
}

fn collect_options(records: &[&TicketRecord], current: &[usize], field: Field) -> StageOptions {
    match field {
        Field::Text(f) => {
            let distinct: FxHashSet<&str> = current.iter().map(|&idx| records[idx].text(f)).collect();
            let mut values: Vec<String> = distinct.into_iter().map(str::to_string).collect();
            values.sort();
            StageOptions::Text(values)
        }
        Field::Time(f) => {
            let distinct: FxHashSet<NaiveDate> = current
                .iter()
                .filter_map(|&idx| records[idx].time(f))
                .map(|ts| ts.date())
                .collect();
            let mut dates: Vec<NaiveDate> = distinct.into_iter().collect();
            dates.sort();
            StageOptions::Dates(dates)
        }
    }
}

/// Decide which predicate a stage applies given its own option list
fn resolve(stage: &FilterStage, options: &StageOptions) -> (Option<Predicate>, Option<StageAdjustment>) {
    let configured = match stage.value() {
        None => {
            let default = default_value(stage, options);
            let adjustment = default.as_ref().map(|applied| StageAdjustment {
                previous: None,
                applied: Some(applied.clone()),
                reason: AdjustmentReason::Defaulted,
            });
            return (default, adjustment);
        }
        Some(value) => value,
    };

    if configured.kind() != stage.kind() {
        return fall_back(stage, options, configured, AdjustmentReason::KindMismatch);
    }

    match configured {
        Predicate::Equals(value) => {
            if options.contains_text(value) {
                (Some(configured.clone()), None)
            } else {
                fall_back(stage, options, configured, AdjustmentReason::Stale)
            }
        }
        Predicate::InSet(set) => {
            let kept: std::collections::BTreeSet<String> = set
                .iter()
                .filter(|v| options.contains_text(v))
                .cloned()
                .collect();
            if kept.len() == set.len() {
                (Some(configured.clone()), None)
            } else if kept.is_empty() {
                fall_back(stage, options, configured, AdjustmentReason::Stale)
            } else {
                narrowed(configured, Predicate::InSet(kept))
            }
        }
        Predicate::DateRange(range) => {
            let clamped = options.bounds().and_then(|bounds| range.clamp(&bounds));
            match clamped {
                Some(c) if c == *range => (Some(configured.clone()), None),
                Some(c) => narrowed(configured, Predicate::DateRange(c)),
                None => fall_back(stage, options, configured, AdjustmentReason::Stale),
            }
        }
    }
}

fn narrowed(previous: &Predicate, applied: Predicate) -> (Option<Predicate>, Option<StageAdjustment>) {
    let adjustment = StageAdjustment {
        previous: Some(previous.clone()),
        applied: Some(applied.clone()),
        reason: AdjustmentReason::Narrowed,
    };
    (Some(applied), Some(adjustment))
}

fn fall_back(
    stage: &FilterStage,
    options: &StageOptions,
    previous: &Predicate,
    reason: AdjustmentReason,
) -> (Option<Predicate>, Option<StageAdjustment>) {
    let applied = default_value(stage, options);
    let adjustment = StageAdjustment {
        previous: Some(previous.clone()),
        applied: applied.clone(),
        reason,
    };
    (applied, Some(adjustment))
}

fn default_value(stage: &FilterStage, options: &StageOptions) -> Option<Predicate> {
    let chosen = match stage.fallback() {
        Fallback::PassThrough => return None,
        Fallback::FirstAvailable => options.as_text().first(),
        Fallback::Preferred(needle) => options
            .as_text()
            .iter()
            .find(|v| v.contains(needle.as_str()))
            .or_else(|| options.as_text().first()),
    };

    match (stage.kind(), options) {
        (Comparison::DateRange, StageOptions::Dates(_)) => options.bounds().map(Predicate::DateRange),
        (Comparison::Equals, StageOptions::Text(_)) => chosen.cloned().map(Predicate::Equals),
        (Comparison::InSet, StageOptions::Text(_)) => chosen.map(|v| Predicate::in_set([v.as_str()])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Schema, TextField, TicketSnapshot, TimeField};

    fn ticket(service: &str, requester: &str, status: &str, opened: Option<(i32, u32, u32)>) -> TicketRecord {
        let mut r = TicketRecord::blank();
        r.service_name = service.to_string();
        r.requester = requester.to_string();
        r.status = status.to_string();
        r.opened_at = opened.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(9, 0, 0));
        r
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot() -> TicketSnapshot {
        TicketSnapshot::new(
            vec![
                ticket("Sustentação", "ana", "Aberto", Some((2025, 1, 2))),
                ticket("Sustentação", "bia", "Fechado", Some((2025, 1, 5))),
                ticket("Sustentação", "ana", "Fechado", Some((2025, 2, 1))),
                ticket("Outro", "caio", "Aberto", Some((2025, 2, 3))),
                ticket("Outro", "bia", "Aberto", None),
            ],
            Schema::complete(),
        )
    }

    #[test]
    fn test_options_come_from_prior_stages_only() {
        let snap = snapshot();
        let stages = vec![
            FilterStage::equals("service", TextField::ServiceName)
                .with_value(Some(Predicate::Equals("Outro".into()))),
            FilterStage::equals("requester", TextField::Requester),
        ];
        let outcome = apply_stages(&snap.view(), &stages);

        // service options computed before the service stage filters
        assert_eq!(
            outcome.options("service").unwrap().as_text(),
            &["Outro".to_string(), "Sustentação".to_string()]
        );
        assert_eq!(
            outcome.options("requester").unwrap().as_text(),
            &["bia".to_string(), "caio".to_string()]
        );
        assert_eq!(outcome.final_view().len(), 2);
    }

    #[test]
    fn test_stale_equals_falls_back() {
        let snap = snapshot();
        let stages = vec![
            FilterStage::equals("service", TextField::ServiceName)
                .with_value(Some(Predicate::Equals("Outro".into()))),
            FilterStage::equals("requester", TextField::Requester)
                .with_value(Some(Predicate::Equals("ana".into()))),
        ];
        let outcome = apply_stages(&snap.view(), &stages);

        let report = outcome.report("requester").unwrap();
        assert_eq!(report.status, StageStatus::PassThrough);
        assert_eq!(report.applied, None);
        let adj = report.adjustment.as_ref().unwrap();
        assert_eq!(adj.reason, AdjustmentReason::Stale);
        assert_eq!(adj.previous, Some(Predicate::Equals("ana".into())));
        assert_eq!(outcome.final_view().len(), 2);
    }

    #[test]
    fn test_preferred_default() {
        let snap = snapshot();
        let stages = vec![FilterStage::equals("service", TextField::ServiceName)
            .with_fallback(Fallback::Preferred("Sustenta".into()))];
        let outcome = apply_stages(&snap.view(), &stages);

        let report = outcome.report("service").unwrap();
        assert_eq!(report.applied, Some(Predicate::Equals("Sustentação".into())));
        assert_eq!(
            report.adjustment.as_ref().map(|a| a.reason),
            Some(AdjustmentReason::Defaulted)
        );
        assert_eq!(report.surviving, 3);
    }

    #[test]
    fn test_preferred_missing_uses_first() {
        let snap = snapshot();
        let stages = vec![FilterStage::equals("service", TextField::ServiceName)
            .with_fallback(Fallback::Preferred("Infra".into()))];
        let outcome = apply_stages(&snap.view(), &stages);
        assert_eq!(
            outcome.report("service").unwrap().applied,
            Some(Predicate::Equals("Outro".into()))
        );
    }

    #[test]
    fn test_date_range_stage() {
        let snap = snapshot();
        let stages = vec![FilterStage::date_range("period", TimeField::OpenedAt)
            .with_value(Some(Predicate::DateRange(DateRange::new(date(2025, 1, 1), date(2025, 1, 31)))))];
        let outcome = apply_stages(&snap.view(), &stages);
        let report = outcome.report("period").unwrap();

        assert_eq!(
            report.options.bounds(),
            Some(DateRange::new(date(2025, 1, 2), date(2025, 2, 3)))
        );
        // clamped to the available span
        assert_eq!(
            report.applied,
            Some(Predicate::DateRange(DateRange::new(date(2025, 1, 2), date(2025, 1, 31))))
        );
        assert_eq!(report.adjustment.as_ref().unwrap().reason, AdjustmentReason::Narrowed);
        assert_eq!(report.surviving, 2);
    }

    #[test]
    fn test_first_available_date_range_is_full_span() {
        let snap = snapshot();
        let stages = vec![FilterStage::date_range("period", TimeField::OpenedAt)
            .with_fallback(Fallback::FirstAvailable)];
        let outcome = apply_stages(&snap.view(), &stages);

        // the ticket without an opening date is excluded
        assert_eq!(outcome.final_view().len(), 4);
    }

    #[test]
    fn test_in_set_drops_missing_members() {
        let snap = snapshot();
        let stages = vec![FilterStage::in_set("status", TextField::Status)
            .with_value(Some(Predicate::in_set(["Aberto", "Cancelado"])))];
        let outcome = apply_stages(&snap.view(), &stages);
        let report = outcome.report("status").unwrap();

        assert_eq!(report.applied, Some(Predicate::in_set(["Aberto"])));
        assert_eq!(report.surviving, 3);
    }

    #[test]
    fn test_kind_mismatch_is_reported() {
        let snap = snapshot();
        let stages = vec![FilterStage::equals("status", TextField::Status)
            .with_value(Some(Predicate::in_set(["Aberto"])))];
        let outcome = apply_stages(&snap.view(), &stages);
        let report = outcome.report("status").unwrap();

        assert_eq!(report.status, StageStatus::PassThrough);
        assert_eq!(
            report.adjustment.as_ref().map(|a| a.reason),
            Some(AdjustmentReason::KindMismatch)
        );
    }

    #[test]
    fn test_empty_survivors_short_circuit() {
        let snap = snapshot();
        let stages = vec![
            FilterStage::date_range("period", TimeField::OpenedAt)
                .with_value(Some(Predicate::DateRange(DateRange::new(date(2025, 1, 3), date(2025, 1, 4))))),
            FilterStage::equals("service", TextField::ServiceName)
                .with_value(Some(Predicate::Equals("Outro".into()))),
        ];
        let outcome = apply_stages(&snap.view(), &stages);

        assert_eq!(outcome.report("period").unwrap().surviving, 0);
        let service = outcome.report("service").unwrap();
        assert_eq!(service.status, StageStatus::ShortCircuited);
        assert!(service.options.is_empty());
        assert_eq!(service.applied, Some(Predicate::Equals("Outro".into())));
        assert!(outcome.final_view().is_empty());
    }

    #[test]
    fn test_unavailable_field_is_pass_through() {
        let mut schema = Schema::default();
        schema.mark(TextField::Status.into());
        let snap = TicketSnapshot::new(snapshot().records().to_vec(), schema);
        let stages = vec![
            FilterStage::equals("contract", TextField::ContractNumber)
                .with_value(Some(Predicate::Equals("1".into()))),
            FilterStage::equals("status", TextField::Status)
                .with_value(Some(Predicate::Equals("Aberto".into()))),
        ];
        let outcome = apply_stages(&snap.view(), &stages);

        assert_eq!(outcome.report("contract").unwrap().status, StageStatus::FieldUnavailable);
        assert_eq!(outcome.report("contract").unwrap().surviving, 5);
        assert_eq!(outcome.final_view().len(), 3);
    }

    #[test]
    fn test_unavailable_field_wins_over_short_circuit() {
        let mut schema = Schema::default();
        schema.mark(TimeField::OpenedAt.into());
        schema.mark(TextField::ServiceName.into());
        let snap = TicketSnapshot::new(snapshot().records().to_vec(), schema);
        let stages = vec![
            FilterStage::date_range("period", TimeField::OpenedAt)
                .with_value(Some(Predicate::DateRange(DateRange::new(date(2025, 1, 3), date(2025, 1, 4))))),
            FilterStage::equals("contract", TextField::ContractNumber)
                .with_value(Some(Predicate::Equals("1".into()))),
            FilterStage::equals("service", TextField::ServiceName)
                .with_value(Some(Predicate::Equals("Outro".into()))),
        ];
        let outcome = apply_stages(&snap.view(), &stages);

        assert_eq!(outcome.report("period").unwrap().status, StageStatus::Applied);
        assert_eq!(outcome.report("period").unwrap().surviving, 0);
        let contract = outcome.report("contract").unwrap();
        assert_eq!(contract.status, StageStatus::FieldUnavailable);
        assert_eq!(contract.surviving, 0);
        assert_eq!(outcome.report("service").unwrap().status, StageStatus::ShortCircuited);
        assert!(outcome.final_view().is_empty());
    }

    #[test]
    fn test_records_after_each_stage() {
        let snap = snapshot();
        let stages = vec![
            FilterStage::equals("service", TextField::ServiceName)
                .with_value(Some(Predicate::Equals("Sustentação".into()))),
            FilterStage::equals("requester", TextField::Requester)
                .with_value(Some(Predicate::Equals("ana".into()))),
            FilterStage::equals("status", TextField::Status)
                .with_value(Some(Predicate::Equals("Fechado".into()))),
        ];
        let outcome = apply_stages(&snap.view(), &stages);

        assert_eq!(outcome.records_at(0).len(), 5);
        assert_eq!(outcome.records_after("service").unwrap().len(), 3);
        assert_eq!(outcome.records_after("requester").unwrap().len(), 2);
        assert_eq!(outcome.final_view().len(), 1);
        assert!(outcome.records_after("missing").is_none());
    }
}
