//! Performance indicators and rankings for medical-report examiners.
//!
//! Raw task records go through validation, per-examiner windows, a
//! population baseline, weighted risk flags, a minimum-volume filter, and
//! finally a deterministic ranking of examiners or org units. The engine is
//! pure; `db` and `source` materialize records, `report` formats rankings.

pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod models;
pub mod overlap;
pub mod population;
pub mod ranking;
pub mod report;
pub mod source;

pub use config::{Baseline, DbConfig, ScoringConfig};
pub use error::ScoringError;
pub use models::{GroupBy, Ranking, RankingRow, TaskRecord};
pub use ranking::compute_ranking;
