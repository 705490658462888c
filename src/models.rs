use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Organizational unit an examiner reports to. Ordered region first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrgUnit {
    pub region: String,
    pub sub_region: String,
}

impl OrgUnit {
    pub fn new(region: impl Into<String>, sub_region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            sub_region: sub_region.into(),
        }
    }
}

impl fmt::Display for OrgUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.region, self.sub_region)
    }
}

/// One examined protocol as supplied by the data-retrieval layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub examiner_id: String,
    pub protocol_id: String,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub non_conformant: bool,
    pub org_unit: OrgUnit,
}

/// A record that passed validation. `end` is `None` for tasks still open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidTask {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub non_conformant: bool,
}

impl ValidTask {
    pub fn duration_seconds(&self) -> Option<f64> {
        self.end
            .map(|end| (end - self.start).num_milliseconds() as f64 / 1000.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExaminerWindow {
    pub examiner_id: String,
    pub org_unit: OrgUnit,
    pub tasks: Vec<ValidTask>,
    pub task_count: usize,
    pub total_duration_seconds: f64,
    pub has_overlap: bool,
    pub short_task_count: usize,
    pub non_conformance_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PopulationStats {
    pub mean_non_conformance_ratio: f64,
    /// Examiners with at least one task, i.e. the ones the baseline is taken over.
    pub examiner_count: usize,
}

/// Which weighted risk flags fired for an examiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RiskFlags {
    pub high_productivity: bool,
    pub overlap: bool,
    pub short_tasks: bool,
    pub non_conformance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorScore {
    pub productivity_rate: f64,
    pub risk_score: f64,
    pub adherence_index: f64,
    pub composite_score: f64,
    pub flags: RiskFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    Examiner,
    OrgUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RankingKey {
    Examiner(String),
    OrgUnit(OrgUnit),
}

impl fmt::Display for RankingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingKey::Examiner(id) => f.write_str(id),
            RankingKey::OrgUnit(unit) => fmt::Display::fmt(unit, f),
        }
    }
}

/// One line of a ranking.
///
/// Examiner rows carry that examiner's values (`examiner_count == 1`,
/// `overlap_count` is 0 or 1). Org-unit rows carry means for rates, ratios
/// and scores, sums for counts, and the number of member examiners with an
/// overlap in `overlap_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub key: RankingKey,
    pub examiner_count: usize,
    pub task_count: usize,
    pub productivity_rate: f64,
    pub short_task_count: usize,
    pub non_conformance_ratio: f64,
    pub overlap_count: usize,
    pub risk_score: f64,
    pub composite_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    NoRecords,
    NoEligibleExaminers,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::NoRecords => f.write_str("no task records in this window"),
            EmptyReason::NoEligibleExaminers => {
                f.write_str("no examiner reached the minimum task count")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ranking {
    Empty(EmptyReason),
    Ranked(Vec<RankingRow>),
}

impl Ranking {
    pub fn rows(&self) -> &[RankingRow] {
        match self {
            Ranking::Empty(_) => &[],
            Ranking::Ranked(rows) => rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}
