use crate::models::{ExaminerWindow, IndicatorScore};

/// Keeps examiners with at least `min_task_count` tasks.
pub fn filter_eligible(
    scored: Vec<(ExaminerWindow, IndicatorScore)>,
    min_task_count: usize,
) -> Vec<(ExaminerWindow, IndicatorScore)> {
    let before = scored.len();
    let eligible: Vec<_> = scored
        .into_iter()
        .filter(|(window, _)| window.task_count >= min_task_count)
        .collect();

    tracing::debug!(
        min_task_count,
        eligible = eligible.len(),
        excluded = before - eligible.len(),
        "applied eligibility filter"
    );
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrgUnit, RiskFlags};

    fn scored(id: &str, task_count: usize) -> (ExaminerWindow, IndicatorScore) {
        (
            ExaminerWindow {
                examiner_id: id.to_string(),
                org_unit: OrgUnit::new("Northeast", "Fortaleza"),
                tasks: Vec::new(),
                task_count,
                total_duration_seconds: 0.0,
                has_overlap: false,
                short_task_count: 0,
                non_conformance_ratio: 0.0,
            },
            IndicatorScore {
                productivity_rate: 0.0,
                risk_score: 0.0,
                adherence_index: 1.0,
                composite_score: 0.0,
                flags: RiskFlags::default(),
            },
        )
    }

    #[test]
    fn keeps_examiners_at_or_above_threshold() {
        let input = vec![scored("A", 49), scored("B", 50), scored("C", 120)];
        let kept = filter_eligible(input, 50);
        let ids: Vec<&str> = kept.iter().map(|(w, _)| w.examiner_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let input = vec![scored("A", 3), scored("B", 70), scored("C", 50), scored("D", 10)];
        let once = filter_eligible(input, 50);
        let twice = filter_eligible(once.clone(), 50);
        assert_eq!(once, twice);
    }

    #[test]
    fn may_leave_nothing() {
        assert!(filter_eligible(vec![scored("A", 1)], 50).is_empty());
    }
}
