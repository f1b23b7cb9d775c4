//! Dashboard pipeline
//!
//! Wires the engines together the way the operational dashboard does:
//!
//! - period → contract → service → requester click → status click cascade
//! - services chart over the records the service dropdown chooses from
//! - requesters chart over the service-stage survivors
//! - status chart over the requester-stage survivors
//! - KPI panel and timeline over the service-stage survivors
//! - detail table, aging report and Gantt over the final survivors
//!
//! [`Dashboard::render`] is a pure function of the snapshot, the selections and
//! `now`; the caller decides when to call it again.

pub mod config;

pub use config::{
    AgingConfig, CascadeConfig, ChartsConfig, ConfigError, ConfigResult, DashboardConfig,
    TableConfig, TimelineConfig,
};

use crate::aggregate::{
    build_timeseries, kpi_summary, status_distribution, top_n_counts, CategoryCount, KpiSummary,
    Timeline,
};
use crate::backlog::{aging_report, gantt_rows, AgingEntry, GanttBar};
use crate::cascade::{
    CascadeOutcome, CascadePlan, CascadeResult, DateRange, Fallback, FilterStage, Predicate,
    Selections, StageReport, CONTRACT_STAGE, PERIOD_STAGE, REQUESTER_STAGE, SERVICE_STAGE,
    STATUS_STAGE,
};
use crate::record::{Field, FieldUnavailable, TextField, TicketRecord, TicketSnapshot, TimeField};
use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Output of one component; a missing field disables the panel, not the page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    Unavailable(Field),
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            Panel::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Panel::Ready(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Panel<U> {
        match self {
            Panel::Ready(value) => Panel::Ready(f(value)),
            Panel::Unavailable(field) => Panel::Unavailable(field),
        }
    }
}

impl<T> From<Result<T, FieldUnavailable>> for Panel<T> {
    fn from(result: Result<T, FieldUnavailable>) -> Self {
        match result {
            Ok(value) => Panel::Ready(value),
            Err(FieldUnavailable(field)) => Panel::Unavailable(field),
        }
    }
}

/// Capped detail table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub rows: Vec<TicketRecord>,
    /// Records before the cap
    pub total: usize,
    pub truncated: bool,
    pub limit: usize,
}

impl TablePage {
    /// Newest first by `opened_at`, undated records last, capped at `limit`
    pub fn build<'a>(records: impl IntoIterator<Item = &'a TicketRecord>, limit: usize) -> Self {
        let mut rows: Vec<TicketRecord> = records.into_iter().cloned().collect();
        rows.sort_by(|a, b| match (a.opened_at, b.opened_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        let total = rows.len();
        rows.truncate(limit);
        Self {
            rows,
            total,
            truncated: total > limit,
            limit,
        }
    }
}

/// Everything one render pass produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViews {
    pub generated_at: NaiveDateTime,
    /// Records in the snapshot
    pub loaded: usize,
    pub stages: Vec<StageReport>,
    /// Selections after absorbing this pass's adjustments; feed them back in next time
    pub selections: Selections,
    pub kpis: KpiSummary,
    pub requesters: Panel<Vec<CategoryCount>>,
    pub services: Panel<Vec<CategoryCount>>,
    pub status: Panel<Vec<CategoryCount>>,
    pub timeline: Timeline,
    pub table: TablePage,
    pub aging: Panel<Vec<AgingEntry>>,
    pub gantt: Panel<Vec<GanttBar>>,
}

/// Configured dashboard
#[derive(Debug, Clone)]
pub struct Dashboard {
    config: DashboardConfig,
    plan: CascadePlan,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> CascadeResult<Self> {
        let plan = Self::build_plan(&config)?;
        debug!(
            "Dashboard plan: {}",
            plan.stages().iter().map(|s| s.id()).collect::<Vec<_>>().join(" → ")
        );
        Ok(Self { config, plan })
    }

    fn build_plan(config: &DashboardConfig) -> CascadeResult<CascadePlan> {
        let mut stages = vec![FilterStage::date_range(PERIOD_STAGE, TimeField::OpenedAt)
            .with_fallback(Fallback::FirstAvailable)];

        if config.cascade.contract_stage {
            stages.push(
                FilterStage::equals(CONTRACT_STAGE, TextField::ContractNumber)
                    .with_fallback(Fallback::FirstAvailable),
            );
        }

        let service_fallback = match &config.cascade.preferred_service {
            Some(needle) => Fallback::Preferred(needle.clone()),
            None => Fallback::FirstAvailable,
        };
        stages.push(FilterStage::equals(SERVICE_STAGE, TextField::ServiceName).with_fallback(service_fallback));
        stages.push(FilterStage::equals(REQUESTER_STAGE, TextField::Requester));
        stages.push(FilterStage::equals(STATUS_STAGE, TextField::Status));

        CascadePlan::new(stages)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn plan(&self) -> &CascadePlan {
        &self.plan
    }

    /// Selections with the configured starting period filled in
    fn effective_selections(&self, selections: &Selections, now: NaiveDateTime) -> Selections {
        let mut effective = selections.clone();
        if self.config.cascade.current_year_only && effective.get(PERIOD_STAGE).is_none() {
            if let Some(year) = DateRange::year(now.year()) {
                effective.set(PERIOD_STAGE, Some(Predicate::DateRange(year)));
            }
        }
        effective
    }

    /// Run the cascade only
    pub fn run<'a>(
        &self,
        snapshot: &'a TicketSnapshot,
        selections: &Selections,
        now: NaiveDateTime,
    ) -> CascadeOutcome<'a> {
        let effective = self.effective_selections(selections, now);
        self.plan.with_selections(&effective).apply(&snapshot.view())
    }

    /// Full recomputation of every panel
    pub fn render(
        &self,
        snapshot: &TicketSnapshot,
        selections: &Selections,
        now: NaiveDateTime,
    ) -> DashboardViews {
        let outcome = self.run(snapshot, selections, now);
        let mut applied = self.effective_selections(selections, now);
        applied.reconcile(&outcome);

        let in_scope = outcome
            .records_after(SERVICE_STAGE)
            .unwrap_or_else(|| outcome.final_view());
        let after_requester = outcome
            .records_after(REQUESTER_STAGE)
            .unwrap_or_else(|| outcome.final_view());
        let final_view = outcome.final_view();
        // the services chart shows what the service dropdown chooses from
        let service_index = outcome
            .reports()
            .iter()
            .position(|r| r.id == SERVICE_STAGE)
            .unwrap_or(0);
        let before_service = outcome.records_at(service_index);

        let charts = &self.config.charts;
        let requesters = top_n_counts(&in_scope, TextField::Requester, charts.top_requesters).into();
        let services = top_n_counts(&before_service, TextField::ServiceName, charts.top_services).into();
        let status = status_distribution(&after_requester).into();

        let timeline = build_timeseries(
            &in_scope,
            &self.config.timeline.metrics,
            self.config.timeline.bucket_rule,
        );

        let aging: Panel<Vec<AgingEntry>> =
            aging_report(&final_view, now, self.config.aging.top_k).into();
        let gantt = aging.clone().map(|entries| gantt_rows(&entries, now));

        let table = TablePage::build(final_view.iter(), self.config.table.row_limit);

        info!(
            "Dashboard rendered: {} loaded, {} in scope, {} in table",
            snapshot.len(),
            in_scope.len(),
            table.total
        );

        DashboardViews {
            generated_at: now,
            loaded: snapshot.len(),
            stages: outcome.reports().to_vec(),
            selections: applied,
            kpis: kpi_summary(&in_scope),
            requesters,
            services,
            status,
            timeline,
            table,
            aging,
            gantt,
        }
    }
}
