//! Selection state carried between render passes
//!
//! The engine is stateless. Whatever the user picked last (dropdown values,
//! a date range, a clicked bar) lives in [`Selections`], which the caller keeps
//! and passes back in on the next pass.

use super::engine::CascadeOutcome;
use super::stage::{DateRange, Predicate};
use super::{PERIOD_STAGE, REQUESTER_STAGE, STATUS_STAGE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Charts that emit category clicks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    /// Top requesters bar chart
    Requesters,
    /// Status pie/legend
    Status,
}

impl ChartId {
    /// Cascade stage fed by clicks on this chart
    pub fn stage_id(&self) -> &'static str {
        match self {
            ChartId::Requesters => REQUESTER_STAGE,
            ChartId::Status => STATUS_STAGE,
        }
    }
}

/// Events accepted from the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InteractionEvent {
    CategorySelected { chart: ChartId, value: String },
    ClearFilters,
    DateRangeSelected { range: DateRange },
    DropdownSelected { stage: String, value: String },
    MultiSelected { stage: String, values: Vec<String> },
}

/// Stage values chosen by the user, keyed by stage id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    values: BTreeMap<String, Predicate>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: &str) -> Option<&Predicate> {
        self.values.get(stage)
    }

    /// Set or clear the value of one stage
    pub fn set(&mut self, stage: impl Into<String>, value: Option<Predicate>) {
        let stage = stage.into();
        match value {
            Some(v) => {
                self.values.insert(stage, v);
            }
            None => {
                self.values.remove(&stage);
            }
        }
    }

    pub fn with(mut self, stage: impl Into<String>, value: Predicate) -> Self {
        self.set(stage, Some(value));
        self
    }

    pub fn clear(&mut self, stage: &str) {
        self.values.remove(stage);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Absorb what the last pass actually applied (stale resets, defaults,
    /// narrowed ranges) so the next pass starts from it
    pub fn reconcile(&mut self, outcome: &CascadeOutcome<'_>) {
        for (stage, adjustment) in outcome.adjustments() {
            self.set(stage, adjustment.applied.clone());
        }
    }
}

/// Folds UI events into [`Selections`]
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    selections: Selections,
}

impl InteractionState {
    pub fn new(selections: Selections) -> Self {
        Self { selections }
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn selections_mut(&mut self) -> &mut Selections {
        &mut self.selections
    }

    pub fn on_category_selected(&mut self, chart: ChartId, value: impl Into<String>) {
        self.selections
            .set(chart.stage_id(), Some(Predicate::Equals(value.into())));
    }

    /// Reset the chart-driven stages; dropdowns and the period stay
    pub fn on_clear_filters(&mut self) {
        self.selections.clear(REQUESTER_STAGE);
        self.selections.clear(STATUS_STAGE);
    }

    pub fn on_date_range(&mut self, range: DateRange) {
        self.selections
            .set(PERIOD_STAGE, Some(Predicate::DateRange(range)));
    }

    pub fn on_dropdown(&mut self, stage: &str, value: impl Into<String>) {
        self.selections
            .set(stage, Some(Predicate::Equals(value.into())));
    }

    /// Apply one event synchronously
    pub fn handle(&mut self, event: InteractionEvent) {
        debug!("Interaction event: {:?}", event);
        match event {
            InteractionEvent::CategorySelected { chart, value } => {
                self.on_category_selected(chart, value)
            }
            InteractionEvent::ClearFilters => self.on_clear_filters(),
            InteractionEvent::DateRangeSelected { range } => self.on_date_range(range),
            InteractionEvent::DropdownSelected { stage, value } => self.on_dropdown(&stage, value),
            InteractionEvent::MultiSelected { stage, values } => {
                let value = (!values.is_empty()).then(|| Predicate::in_set(values));
                self.selections.set(stage, value);
            }
        }
    }

    /// Keep the values the last pass settled on
    pub fn absorb(&mut self, outcome: &CascadeOutcome<'_>) {
        self.selections.reconcile(outcome);
    }
}
