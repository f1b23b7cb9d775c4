//! Dashboard configuration
//!
//! Every section has defaults matching the operational dashboard, so a YAML
//! file only needs the keys it changes:
//!
//! ```yaml
//! cascade:
//!   preferred_service: Sustenta
//!   current_year_only: true
//! timeline:
//!   bucket_rule: monthly
//! table:
//!   row_limit: 200
//! ```

use crate::aggregate::{BucketRule, MetricSpec};
use crate::record::ColumnMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value parsed but is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Cascade behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Insert a contract dropdown between period and service
    pub contract_stage: bool,
    /// Service picked by default: first option containing this substring
    pub preferred_service: Option<String>,
    /// Start the period picker on the current calendar year instead of the full span
    pub current_year_only: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            contract_stage: true,
            preferred_service: Some("Sustenta".to_string()),
            current_year_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub top_requesters: usize,
    pub top_services: usize,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            top_requesters: 10,
            top_services: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub bucket_rule: BucketRule,
    pub metrics: Vec<MetricSpec>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            bucket_rule: BucketRule::WeeklyMondayStart,
            metrics: MetricSpec::defaults(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgingConfig {
    pub top_k: usize,
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self { top_k: 15 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Maximum rows of the detail table
    pub row_limit: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { row_limit: 500 }
    }
}

/// Full dashboard configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub columns: ColumnMap,
    pub cascade: CascadeConfig,
    pub charts: ChartsConfig,
    pub timeline: TimelineConfig,
    pub aging: AgingConfig,
    pub table: TableConfig,
}

impl DashboardConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: DashboardConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.charts.top_requesters == 0 {
            return Err(ConfigError::Invalid("charts.top_requesters must be > 0".into()));
        }
        if self.charts.top_services == 0 {
            return Err(ConfigError::Invalid("charts.top_services must be > 0".into()));
        }
        if self.table.row_limit == 0 {
            return Err(ConfigError::Invalid("table.row_limit must be > 0".into()));
        }
        if let Some(metric) = self.timeline.metrics.iter().find(|m| m.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "timeline metric on {} has an empty name",
                metric.field.name()
            )));
        }
        if matches!(&self.cascade.preferred_service, Some(s) if s.is_empty()) {
            return Err(ConfigError::Invalid(
                "cascade.preferred_service must not be empty (omit it instead)".into(),
            ));
        }
        Ok(())
    }
}
