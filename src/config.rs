use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

pub const DEFAULT_MIN_TASK_COUNT: usize = 50;

/// Reference value the non-conformance flag compares against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Baseline {
    #[default]
    Mean,
    /// Drops `floor(n * fraction)` ratios from each end before averaging.
    TrimmedMean { fraction: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub short_duration_threshold_seconds: f64,
    /// Tasks per hour.
    pub productivity_threshold: f64,
    pub min_short_task_count: usize,
    pub non_conformance_multiplier: f64,
    pub baseline: Baseline,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            short_duration_threshold_seconds: 15.0,
            productivity_threshold: 50.0,
            min_short_task_count: 10,
            non_conformance_multiplier: 2.0,
            baseline: Baseline::Mean,
        }
    }
}

impl ScoringConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scoring config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid scoring config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        if !(self.short_duration_threshold_seconds > 0.0) {
            return Err(invalid(format!(
                "short_duration_threshold_seconds must be positive, got {}",
                self.short_duration_threshold_seconds
            )));
        }
        if !(self.productivity_threshold > 0.0) {
            return Err(invalid(format!(
                "productivity_threshold must be positive, got {}",
                self.productivity_threshold
            )));
        }
        if self.min_short_task_count == 0 {
            return Err(invalid("min_short_task_count must be positive".to_string()));
        }
        if !(self.non_conformance_multiplier > 0.0) {
            return Err(invalid(format!(
                "non_conformance_multiplier must be positive, got {}",
                self.non_conformance_multiplier
            )));
        }
        if let Baseline::TrimmedMean { fraction } = self.baseline {
            if !(0.0..0.5).contains(&fraction) {
                return Err(invalid(format!(
                    "trimmed mean fraction must be in [0, 0.5), got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

pub fn validate_min_task_count(min_task_count: usize) -> Result<(), ScoringError> {
    if min_task_count == 0 {
        return Err(invalid("min_task_count must be positive".to_string()));
    }
    Ok(())
}

fn invalid(message: String) -> ScoringError {
    ScoringError::InvalidConfiguration(message)
}

/// Connection settings for the task store, passed explicitly to `db::connect`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
        }
    }
}
