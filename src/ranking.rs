use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::{validate_min_task_count, ScoringConfig};
use crate::eligibility::filter_eligible;
use crate::error::ScoringError;
use crate::indicators::{build_windows, score_window};
use crate::models::{
    EmptyReason, ExaminerWindow, GroupBy, IndicatorScore, OrgUnit, Ranking, RankingKey,
    RankingRow, TaskRecord,
};
use crate::population::population_stats;

/// Scores every examiner in `records` and ranks examiners or org units.
///
/// Malformed records are dropped with a warning. An empty input, or one where
/// nobody reaches `min_task_count`, comes back as `Ranking::Empty`.
pub fn compute_ranking(
    records: &[TaskRecord],
    config: &ScoringConfig,
    group_by: GroupBy,
    min_task_count: usize,
) -> Result<Ranking, ScoringError> {
    config.validate()?;
    validate_min_task_count(min_task_count)?;

    let set = build_windows(records, config);
    if set.windows.is_empty() {
        tracing::info!(records = records.len(), "no scorable task records");
        return Ok(Ranking::Empty(EmptyReason::NoRecords));
    }

    let population = population_stats(&set.windows, config.baseline);

    let mut scored = Vec::with_capacity(set.windows.len());
    for window in set.windows {
        let score = score_window(&window, &population, config)?;
        scored.push((window, score));
    }

    let eligible = filter_eligible(scored, min_task_count);
    if eligible.is_empty() {
        return Ok(Ranking::Empty(EmptyReason::NoEligibleExaminers));
    }

    let rows = match group_by {
        GroupBy::Examiner => rank_examiners(&eligible),
        GroupBy::OrgUnit => rank_org_units(&eligible),
    };

    tracing::info!(
        ?group_by,
        rows = rows.len(),
        malformed = set.malformed,
        baseline = population.mean_non_conformance_ratio,
        "ranking computed"
    );
    Ok(Ranking::Ranked(rows))
}

type Scored = (ExaminerWindow, IndicatorScore);

pub fn rank_examiners(eligible: &[Scored]) -> Vec<RankingRow> {
    let mut rows: Vec<RankingRow> = eligible
        .iter()
        .map(|(window, score)| RankingRow {
            key: RankingKey::Examiner(window.examiner_id.clone()),
            examiner_count: 1,
            task_count: window.task_count,
            productivity_rate: score.productivity_rate,
            short_task_count: window.short_task_count,
            non_conformance_ratio: window.non_conformance_ratio,
            overlap_count: usize::from(window.has_overlap),
            risk_score: score.risk_score,
            composite_score: score.composite_score,
        })
        .collect();
    sort_rows(&mut rows);
    rows
}

pub fn rank_org_units(eligible: &[Scored]) -> Vec<RankingRow> {
    let mut groups: BTreeMap<&OrgUnit, Vec<&Scored>> = BTreeMap::new();
    for entry in eligible {
        groups.entry(&entry.0.org_unit).or_default().push(entry);
    }

    let mut rows: Vec<RankingRow> = groups
        .into_iter()
        .map(|(unit, members)| RankingRow {
            key: RankingKey::OrgUnit(unit.clone()),
            examiner_count: members.len(),
            task_count: members.iter().map(|(w, _)| w.task_count).sum(),
            productivity_rate: mean_by(&members, |(_, s)| s.productivity_rate),
            short_task_count: members.iter().map(|(w, _)| w.short_task_count).sum(),
            non_conformance_ratio: mean_by(&members, |(w, _)| w.non_conformance_ratio),
            overlap_count: members.iter().filter(|(w, _)| w.has_overlap).count(),
            risk_score: mean_by(&members, |(_, s)| s.risk_score),
            composite_score: mean_by(&members, |(_, s)| s.composite_score),
        })
        .collect();
    sort_rows(&mut rows);
    rows
}

fn mean_by(members: &[&Scored], value: impl Fn(&Scored) -> f64) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    members.iter().map(|&member| value(member)).sum::<f64>() / members.len() as f64
}

// Composite descending, then key ascending.
fn sort_rows(rows: &mut [RankingRow]) {
    rows.sort_by(|a, b| match b.composite_score.total_cmp(&a.composite_score) {
        Ordering::Equal => a.key.cmp(&b.key),
        other => other,
    });
}
