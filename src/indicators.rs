use std::collections::{BTreeMap, HashMap};

use crate::config::ScoringConfig;
use crate::error::{MalformedRecord, ScoringError};
use crate::models::{
    ExaminerWindow, IndicatorScore, OrgUnit, PopulationStats, RiskFlags, TaskRecord, ValidTask,
};
use crate::overlap::has_overlap;

pub const PRODUCTIVITY_WEIGHT: f64 = 3.0;
pub const OVERLAP_WEIGHT: f64 = 2.5;
pub const SHORT_TASK_WEIGHT: f64 = 2.0;
pub const NON_CONFORMANCE_WEIGHT: f64 = 1.0;

pub fn validate_record(record: &TaskRecord) -> Result<ValidTask, MalformedRecord> {
    if record.examiner_id.trim().is_empty() {
        return Err(MalformedRecord::MissingExaminer);
    }
    if record.protocol_id.trim().is_empty() {
        return Err(MalformedRecord::MissingProtocol);
    }
    let start = record.start_time.ok_or(MalformedRecord::MissingStart)?;
    if let Some(end) = record.end_time {
        if end < start {
            return Err(MalformedRecord::EndBeforeStart);
        }
    }
    Ok(ValidTask {
        start,
        end: record.end_time,
        non_conformant: record.non_conformant,
    })
}

/// Windows built from a batch of records, plus how many records were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    pub windows: Vec<ExaminerWindow>,
    pub malformed: usize,
}

/// Groups valid records by examiner, ordered by examiner id.
pub fn build_windows(records: &[TaskRecord], config: &ScoringConfig) -> WindowSet {
    let mut grouped: BTreeMap<&str, (Vec<ValidTask>, HashMap<&OrgUnit, usize>)> = BTreeMap::new();
    let mut malformed = 0usize;

    for record in records {
        match validate_record(record) {
            Ok(task) => {
                let entry = grouped.entry(record.examiner_id.as_str()).or_default();
                entry.0.push(task);
                *entry.1.entry(&record.org_unit).or_insert(0) += 1;
            }
            Err(reason) => {
                malformed += 1;
                tracing::debug!(
                    examiner_id = %record.examiner_id,
                    protocol_id = %record.protocol_id,
                    %reason,
                    "excluding malformed task record"
                );
            }
        }
    }

    if malformed > 0 {
        tracing::warn!(malformed, "excluded malformed task records");
    }

    let windows = grouped
        .into_iter()
        .map(|(examiner_id, (tasks, units))| {
            let org_unit = dominant_org_unit(units);
            build_window(examiner_id, org_unit, tasks, config)
        })
        .collect();

    WindowSet { windows, malformed }
}

// Most frequent unit; ties go to the smallest key.
fn dominant_org_unit(units: HashMap<&OrgUnit, usize>) -> OrgUnit {
    units
        .into_iter()
        .max_by(|(a_unit, a_count), (b_unit, b_count)| {
            a_count.cmp(b_count).then_with(|| b_unit.cmp(a_unit))
        })
        .map(|(unit, _)| unit.clone())
        .unwrap_or_else(|| OrgUnit::new("", ""))
}

pub fn build_window(
    examiner_id: &str,
    org_unit: OrgUnit,
    tasks: Vec<ValidTask>,
    config: &ScoringConfig,
) -> ExaminerWindow {
    let task_count = tasks.len();
    let mut total_duration_seconds = 0.0;
    let mut short_task_count = 0usize;
    let mut non_conformant = 0usize;
    let mut intervals = Vec::with_capacity(task_count);

    for task in &tasks {
        if task.non_conformant {
            non_conformant += 1;
        }
        if let (Some(end), Some(duration)) = (task.end, task.duration_seconds()) {
            total_duration_seconds += duration;
            if duration <= config.short_duration_threshold_seconds {
                short_task_count += 1;
            }
            intervals.push((task.start, end));
        }
    }

    ExaminerWindow {
        examiner_id: examiner_id.to_string(),
        org_unit,
        task_count,
        total_duration_seconds,
        has_overlap: has_overlap(&intervals),
        short_task_count,
        non_conformance_ratio: ratio(non_conformant as f64, task_count as f64),
        tasks,
    }
}

pub fn score_window(
    window: &ExaminerWindow,
    population: &PopulationStats,
    config: &ScoringConfig,
) -> Result<IndicatorScore, ScoringError> {
    if window.task_count == 0 {
        return Err(ScoringError::InvalidWindow {
            examiner_id: window.examiner_id.clone(),
        });
    }

    let productivity_rate = ratio(
        window.task_count as f64,
        window.total_duration_seconds / 3600.0,
    );

    let flags = RiskFlags {
        high_productivity: productivity_rate >= config.productivity_threshold,
        overlap: window.has_overlap,
        short_tasks: window.short_task_count >= config.min_short_task_count,
        non_conformance: window.non_conformance_ratio
            >= config.non_conformance_multiplier * population.mean_non_conformance_ratio,
    };

    let risk_score = risk_score(&flags);
    let adherence_index = 1.0 - window.non_conformance_ratio;

    Ok(IndicatorScore {
        productivity_rate,
        risk_score,
        adherence_index,
        composite_score: risk_score + (1.0 - adherence_index),
        flags,
    })
}

pub fn risk_score(flags: &RiskFlags) -> f64 {
    let mut score = 0.0;
    if flags.high_productivity {
        score += PRODUCTIVITY_WEIGHT;
    }
    if flags.overlap {
        score += OVERLAP_WEIGHT;
    }
    if flags.short_tasks {
        score += SHORT_TASK_WEIGHT;
    }
    if flags.non_conformance {
        score += NON_CONFORMANCE_WEIGHT;
    }
    score
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    fn record(examiner: &str, start_s: i64, duration_s: Option<i64>, nc: bool) -> TaskRecord {
        let start = base() + Duration::seconds(start_s);
        TaskRecord {
            examiner_id: examiner.to_string(),
            protocol_id: format!("P-{examiner}-{start_s}"),
            start_time: Some(start),
            end_time: duration_s.map(|d| start + Duration::seconds(d)),
            non_conformant: nc,
            org_unit: OrgUnit::new("South", "Porto Alegre"),
        }
    }

    // 60 tasks in 3600s: 12 of 10s, 48 of 72.5s, one overlapping pair, half non-conformant.
    fn scenario_records() -> Vec<TaskRecord> {
        let mut records = Vec::new();
        let mut cursor = 0i64;
        for i in 0..60 {
            let duration_ms: i64 = if i < 12 { 10_000 } else { 72_500 };
            let start = base() + Duration::milliseconds(cursor);
            records.push(TaskRecord {
                examiner_id: "A".to_string(),
                protocol_id: format!("P-{i}"),
                start_time: Some(start),
                end_time: Some(start + Duration::milliseconds(duration_ms)),
                non_conformant: i % 2 == 0,
                org_unit: OrgUnit::new("South", "Porto Alegre"),
            });
            cursor += duration_ms;
        }
        // Pull the last task back so it starts before the previous one ends.
        let last = records.last_mut().unwrap();
        let shift = Duration::seconds(5);
        last.start_time = last.start_time.map(|s| s - shift);
        last.end_time = last.end_time.map(|e| e - shift);
        records
    }

    #[test]
    fn rejects_malformed_records() {
        let mut missing_start = record("A", 0, Some(10), false);
        missing_start.start_time = None;
        assert_eq!(
            validate_record(&missing_start),
            Err(MalformedRecord::MissingStart)
        );

        let mut inverted = record("A", 100, Some(10), false);
        inverted.end_time = Some(base());
        assert_eq!(
            validate_record(&inverted),
            Err(MalformedRecord::EndBeforeStart)
        );

        let mut anonymous = record("A", 0, Some(10), false);
        anonymous.examiner_id = "  ".to_string();
        assert_eq!(
            validate_record(&anonymous),
            Err(MalformedRecord::MissingExaminer)
        );

        let mut unnamed = record("A", 0, Some(10), false);
        unnamed.protocol_id.clear();
        assert_eq!(
            validate_record(&unnamed),
            Err(MalformedRecord::MissingProtocol)
        );
    }

    #[test]
    fn build_windows_counts_and_drops_malformed() {
        let mut bad = record("B", 50, Some(10), false);
        bad.end_time = Some(base());
        let records = vec![
            record("B", 0, Some(10), true),
            record("A", 0, Some(20), false),
            bad,
        ];

        let set = build_windows(&records, &ScoringConfig::default());
        assert_eq!(set.malformed, 1);
        let ids: Vec<&str> = set.windows.iter().map(|w| w.examiner_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(set.windows[1].task_count, 1);
        assert_eq!(set.windows[1].non_conformance_ratio, 1.0);
    }

    #[test]
    fn open_tasks_count_but_carry_no_duration() {
        let records = vec![
            record("A", 0, Some(10), false),
            record("A", 5, None, true),
            record("A", 100, Some(60), false),
        ];
        let window = &build_windows(&records, &ScoringConfig::default()).windows[0];
        assert_eq!(window.task_count, 3);
        assert_eq!(window.total_duration_seconds, 70.0);
        assert_eq!(window.short_task_count, 1);
        assert!(!window.has_overlap);
        assert!((window.non_conformance_ratio - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn short_threshold_is_inclusive() {
        let records = vec![
            record("A", 0, Some(15), false),
            record("A", 100, Some(16), false),
        ];
        let window = &build_windows(&records, &ScoringConfig::default()).windows[0];
        assert_eq!(window.short_task_count, 1);
    }

    #[test]
    fn org_unit_follows_majority_of_records() {
        let mut moved = record("A", 200, Some(30), false);
        moved.org_unit = OrgUnit::new("North", "Belem");
        let records = vec![
            record("A", 0, Some(30), false),
            record("A", 100, Some(30), false),
            moved,
        ];
        let window = &build_windows(&records, &ScoringConfig::default()).windows[0];
        assert_eq!(window.org_unit, OrgUnit::new("South", "Porto Alegre"));
    }

    #[test]
    fn scenario_scores_all_four_flags() {
        let config = ScoringConfig::default();
        let set = build_windows(&scenario_records(), &config);
        let window = &set.windows[0];
        assert_eq!(window.task_count, 60);
        assert!((window.total_duration_seconds - 3600.0).abs() < 1e-6);
        assert!(window.has_overlap);
        assert_eq!(window.short_task_count, 12);
        assert_eq!(window.non_conformance_ratio, 0.5);

        let population = PopulationStats {
            mean_non_conformance_ratio: 0.1,
            examiner_count: 8,
        };
        let score = score_window(window, &population, &config).unwrap();
        assert!((score.productivity_rate - 60.0).abs() < 1e-6);
        assert_eq!(score.risk_score, 8.5);
        assert_eq!(score.adherence_index, 0.5);
        assert_eq!(score.composite_score, 9.0);
        assert_eq!(
            score.flags,
            RiskFlags {
                high_productivity: true,
                overlap: true,
                short_tasks: true,
                non_conformance: true,
            }
        );
    }

    #[test]
    fn zero_duration_yields_zero_productivity() {
        let records = vec![record("A", 0, None, false), record("A", 10, Some(0), false)];
        let window = &build_windows(&records, &ScoringConfig::default()).windows[0];
        let score =
            score_window(window, &PopulationStats::default(), &ScoringConfig::default()).unwrap();
        assert_eq!(score.productivity_rate, 0.0);
        assert!(!score.flags.high_productivity);
    }

    #[test]
    fn zero_task_window_is_invalid() {
        let window = build_window(
            "ghost",
            OrgUnit::new("East", "Recife"),
            Vec::new(),
            &ScoringConfig::default(),
        );
        assert_eq!(window.non_conformance_ratio, 0.0);
        let result = score_window(&window, &PopulationStats::default(), &ScoringConfig::default());
        assert_eq!(
            result,
            Err(ScoringError::InvalidWindow {
                examiner_id: "ghost".to_string()
            })
        );
    }

    #[test]
    fn composite_is_monotone_in_each_flag() {
        let none = RiskFlags::default();
        let variants = [
            RiskFlags { high_productivity: true, ..none },
            RiskFlags { overlap: true, ..none },
            RiskFlags { short_tasks: true, ..none },
            RiskFlags { non_conformance: true, ..none },
        ];
        for flags in variants {
            assert!(risk_score(&flags) > risk_score(&none));
            let all = RiskFlags {
                high_productivity: true,
                overlap: true,
                short_tasks: true,
                non_conformance: true,
            };
            assert!(risk_score(&all) >= risk_score(&flags));
        }
    }
}
