use std::fmt::Write;
use std::io;

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::models::{GroupBy, Ranking, RankingRow};
use crate::source::Period;

#[derive(Debug, Serialize)]
struct CsvRankingRow<'a> {
    rank: usize,
    key: String,
    examiner_count: usize,
    task_count: usize,
    productivity_rate: f64,
    short_task_count: usize,
    non_conformance_ratio: f64,
    overlap_count: usize,
    risk_score: f64,
    composite_score: f64,
    group_by: &'a str,
}

fn group_label(group_by: GroupBy) -> &'static str {
    match group_by {
        GroupBy::Examiner => "examiner",
        GroupBy::OrgUnit => "org-unit",
    }
}

pub fn format_row(rank: usize, row: &RankingRow) -> String {
    format!(
        "{rank}. {} composite {:.2} (risk {:.1}) across {} tasks, {:.1} tasks/h, {} short, {:.0}% non-conformant, {} overlapping",
        row.key,
        row.composite_score,
        row.risk_score,
        row.task_count,
        row.productivity_rate,
        row.short_task_count,
        row.non_conformance_ratio * 100.0,
        row.overlap_count
    )
}

pub fn build_report(
    ranking: &Ranking,
    group_by: GroupBy,
    period: &Period,
    config: &ScoringConfig,
    min_task_count: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Examiner Indicator Report");
    let _ = writeln!(
        output,
        "Ranking by {} for {}",
        group_label(group_by),
        period.label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Thresholds");
    let _ = writeln!(
        output,
        "- Productivity flag at {:.0} tasks/hour",
        config.productivity_threshold
    );
    let _ = writeln!(
        output,
        "- Short tasks: {:.0}s or less, flagged from {} tasks",
        config.short_duration_threshold_seconds, config.min_short_task_count
    );
    let _ = writeln!(
        output,
        "- Non-conformance flag at {:.1}x the population baseline ({:?})",
        config.non_conformance_multiplier, config.baseline
    );
    let _ = writeln!(output, "- Minimum volume: {min_task_count} tasks");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Ranking");

    match ranking {
        Ranking::Empty(reason) => {
            let _ = writeln!(output, "No data: {reason}.");
        }
        Ranking::Ranked(rows) => {
            let _ = writeln!(
                output,
                "| # | {} | Examiners | Tasks | Tasks/h | Short | Non-conf. | Overlap | Risk | Composite |",
                match group_by {
                    GroupBy::Examiner => "Examiner",
                    GroupBy::OrgUnit => "Org unit",
                }
            );
            let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|---|");
            for (index, row) in rows.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "| {} | {} | {} | {} | {:.1} | {} | {:.1}% | {} | {:.2} | {:.2} |",
                    index + 1,
                    row.key,
                    row.examiner_count,
                    row.task_count,
                    row.productivity_rate,
                    row.short_task_count,
                    row.non_conformance_ratio * 100.0,
                    row.overlap_count,
                    row.risk_score,
                    row.composite_score
                );
            }
        }
    }

    output
}

pub fn write_csv<W: io::Write>(
    writer: W,
    ranking: &Ranking,
    group_by: GroupBy,
) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (index, row) in ranking.rows().iter().enumerate() {
        writer.serialize(CsvRankingRow {
            rank: index + 1,
            key: row.key.to_string(),
            examiner_count: row.examiner_count,
            task_count: row.task_count,
            productivity_rate: row.productivity_rate,
            short_task_count: row.short_task_count,
            non_conformance_ratio: row.non_conformance_ratio,
            overlap_count: row.overlap_count,
            risk_score: row.risk_score,
            composite_score: row.composite_score,
            group_by: group_label(group_by),
        })?;
    }
    writer.flush()?;
    Ok(())
}
