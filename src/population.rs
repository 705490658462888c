use crate::config::Baseline;
use crate::models::{ExaminerWindow, PopulationStats};

/// Baseline non-conformance over examiners that have at least one task.
///
/// Zero-task windows are left out entirely rather than counted as a 0 ratio,
/// otherwise an idle examiner would drag the threshold down for everyone.
pub fn population_stats(windows: &[ExaminerWindow], baseline: Baseline) -> PopulationStats {
    let mut ratios: Vec<f64> = windows
        .iter()
        .filter(|window| window.task_count > 0)
        .map(|window| window.non_conformance_ratio)
        .collect();

    let examiner_count = ratios.len();
    let mean_non_conformance_ratio = match baseline {
        Baseline::Mean => mean(&ratios),
        Baseline::TrimmedMean { fraction } => {
            ratios.sort_by(f64::total_cmp);
            let trim = (ratios.len() as f64 * fraction).floor() as usize;
            if trim * 2 >= ratios.len() {
                mean(&ratios)
            } else {
                mean(&ratios[trim..ratios.len() - trim])
            }
        }
    };

    tracing::debug!(
        examiner_count,
        mean_non_conformance_ratio,
        ?baseline,
        "computed population baseline"
    );

    PopulationStats {
        mean_non_conformance_ratio,
        examiner_count,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrgUnit;

    fn window(id: &str, task_count: usize, ratio: f64) -> ExaminerWindow {
        ExaminerWindow {
            examiner_id: id.to_string(),
            org_unit: OrgUnit::new("Center-West", "Goiania"),
            tasks: Vec::new(),
            task_count,
            total_duration_seconds: 0.0,
            has_overlap: false,
            short_task_count: 0,
            non_conformance_ratio: ratio,
        }
    }

    #[test]
    fn excludes_zero_task_examiners_from_mean() {
        let mut windows: Vec<ExaminerWindow> =
            (0..5).map(|i| window(&format!("E{i}"), 10, 0.1)).collect();
        windows.extend((0..3).map(|i| window(&format!("Z{i}"), 0, 0.0)));

        let stats = population_stats(&windows, Baseline::Mean);
        assert_eq!(stats.examiner_count, 5);
        assert!((stats.mean_non_conformance_ratio - 0.1).abs() < 1e-12);
    }

    #[test]
    fn empty_population_has_zero_baseline() {
        let stats = population_stats(&[], Baseline::Mean);
        assert_eq!(stats, PopulationStats::default());
    }

    #[test]
    fn trimmed_mean_drops_extremes() {
        let ratios = [0.0, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 1.0];
        let windows: Vec<ExaminerWindow> = ratios
            .iter()
            .enumerate()
            .map(|(i, r)| window(&format!("E{i}"), 20, *r))
            .collect();

        let plain = population_stats(&windows, Baseline::Mean);
        assert!((plain.mean_non_conformance_ratio - 0.18).abs() < 1e-9);

        let trimmed = population_stats(&windows, Baseline::TrimmedMean { fraction: 0.1 });
        assert!((trimmed.mean_non_conformance_ratio - 0.1).abs() < 1e-9);
        assert_eq!(trimmed.examiner_count, 10);
    }

    #[test]
    fn zero_fraction_trim_matches_plain_mean() {
        let windows = vec![window("A", 4, 0.25), window("B", 2, 0.5)];
        assert_eq!(
            population_stats(&windows, Baseline::TrimmedMean { fraction: 0.0 }),
            population_stats(&windows, Baseline::Mean)
        );
    }
}
