use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::models::{OrgUnit, TaskRecord};

/// Reporting window on task start, both ends inclusive calendar days.
/// A missing bound means the whole available history on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Period {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> anyhow::Result<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            anyhow::ensure!(start <= end, "period start {start} is after period end {end}");
        }
        Ok(Self { start, end })
    }

    /// First instant inside the window.
    pub fn lower(&self) -> Option<NaiveDateTime> {
        self.start.map(|day| day.and_time(NaiveTime::MIN))
    }

    /// First instant after the window.
    pub fn upper(&self) -> Option<NaiveDateTime> {
        self.end
            .and_then(|day| day.checked_add_days(Days::new(1)))
            .map(|day| day.and_time(NaiveTime::MIN))
    }

    /// Records without a start time are kept so validation can count them.
    pub fn contains(&self, record: &TaskRecord) -> bool {
        let Some(start) = record.start_time else {
            return true;
        };
        self.lower().map_or(true, |lower| start >= lower)
            && self.upper().map_or(true, |upper| start < upper)
    }

    pub fn label(&self) -> String {
        match (self.start, self.end) {
            (None, None) => "entire history".to_string(),
            (Some(start), None) => format!("since {start}"),
            (None, Some(end)) => format!("through {end}"),
            (Some(start), Some(end)) => format!("{start} to {end}"),
        }
    }
}

/// One row of a task export. Timestamps use `YYYY-MM-DDTHH:MM:SS`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskCsvRow {
    pub examiner_id: String,
    #[serde(default)]
    pub examiner_name: Option<String>,
    pub region: String,
    pub sub_region: String,
    pub protocol_id: String,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub non_conformant: bool,
    #[serde(default)]
    pub source_key: Option<String>,
}

impl From<&TaskCsvRow> for TaskRecord {
    fn from(row: &TaskCsvRow) -> Self {
        TaskRecord {
            examiner_id: row.examiner_id.clone(),
            protocol_id: row.protocol_id.clone(),
            start_time: row.started_at,
            end_time: row.finished_at,
            non_conformant: row.non_conformant,
            org_unit: OrgUnit::new(row.region.clone(), row.sub_region.clone()),
        }
    }
}

pub fn read_csv_rows<R: Read>(reader: R) -> anyhow::Result<Vec<TaskCsvRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<TaskCsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid task row {}", index + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Offline counterpart of `db::fetch_task_records`.
pub fn load_csv_records(path: &Path, period: &Period) -> anyhow::Result<Vec<TaskRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let records: Vec<TaskRecord> = read_csv_rows(file)?
        .iter()
        .map(TaskRecord::from)
        .filter(|record| period.contains(record))
        .collect();
    tracing::info!(
        path = %path.display(),
        period = %period.label(),
        records = records.len(),
        "loaded task records from csv"
    );
    Ok(records)
}
