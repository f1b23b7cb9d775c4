//! Cascade filter engine
//!
//! An ordered chain of scoped filters (period → contract → service →
//! requester click → status click). Each stage's option list derives from the
//! survivors of the stages before it, never from its own output.

pub mod engine;
pub mod selection;
pub mod stage;

pub use engine::{
    apply_stages, AdjustmentReason, CascadeOutcome, StageAdjustment, StageOptions, StageReport,
    StageStatus,
};
pub use selection::{ChartId, InteractionEvent, InteractionState, Selections};
pub use stage::{Comparison, DateRange, Fallback, FilterStage, Predicate};

use crate::record::{Field, TicketView};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Stage ids of the operational dashboard
pub const PERIOD_STAGE: &str = "period";
pub const CONTRACT_STAGE: &str = "contract";
pub const SERVICE_STAGE: &str = "service";
pub const REQUESTER_STAGE: &str = "requester";
pub const STATUS_STAGE: &str = "status";

/// Invalid cascade definitions
#[derive(Error, Debug, PartialEq)]
pub enum CascadeError {
    /// Comparison cannot be evaluated on the field
    #[error("stage '{id}': {kind:?} cannot be applied to field {field}")]
    InvalidStage {
        id: String,
        field: Field,
        kind: Comparison,
    },

    /// Two stages share an id
    #[error("duplicate stage id: {0}")]
    DuplicateStage(String),
}

pub type CascadeResult<T> = Result<T, CascadeError>;

/// A validated, ordered list of stages
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePlan {
    stages: Vec<FilterStage>,
}

impl CascadePlan {
    pub fn new(stages: Vec<FilterStage>) -> CascadeResult<Self> {
        let mut seen = FxHashSet::default();
        for stage in &stages {
            if !stage.kind().accepts(stage.field()) {
                return Err(CascadeError::InvalidStage {
                    id: stage.id().to_string(),
                    field: stage.field(),
                    kind: stage.kind(),
                });
            }
            if !seen.insert(stage.id()) {
                return Err(CascadeError::DuplicateStage(stage.id().to_string()));
            }
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&FilterStage> {
        self.stages.iter().find(|s| s.id() == id)
    }

    /// Copy of the plan with each stage's value taken from `selections`
    pub fn with_selections(&self, selections: &Selections) -> CascadePlan {
        let stages = self
            .stages
            .iter()
            .map(|stage| {
                let mut stage = stage.clone();
                if let Some(value) = selections.get(stage.id()) {
                    stage.set_value(Some(value.clone()));
                }
                stage
            })
            .collect();
        CascadePlan { stages }
    }

    pub fn apply<'a>(&self, view: &TicketView<'a>) -> CascadeOutcome<'a> {
        apply_stages(view, &self.stages)
    }
}
