use log::info;

use crate::join::AnalysisRow;

/// Median of the present values, averaging the middle pair for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Flag rows with zero steps but above-median calories and return the median used.
///
/// Missing steps or calories count as 0 for the comparison only. With no
/// calories at all there is no median and nothing is flagged.
pub fn apply_quality_flags(rows: &mut [AnalysisRow]) -> Option<f64> {
    let calories: Vec<f64> = rows.iter().filter_map(|r| r.calories).collect();
    let cal_median = median(&calories);

    for row in rows.iter_mut() {
        let steps = row.total_steps.unwrap_or(0.0);
        let cal = row.calories.unwrap_or(0.0);
        row.zero_step_high_cal = cal_median.is_some_and(|m| steps == 0.0 && cal > m);
        row.valid_row = !row.zero_step_high_cal;
    }

    let flagged = rows.iter().filter(|r| r.zero_step_high_cal).count();
    info!(
        "Calories median {:?}; {} of {} rows flagged zero_step_high_cal",
        cal_median,
        flagged,
        rows.len()
    );
    cal_median
}

/// Rows that passed the quality filter.
pub fn valid_rows(rows: &[AnalysisRow]) -> Vec<AnalysisRow> {
    let valid: Vec<AnalysisRow> = rows.iter().filter(|r| r.valid_row).cloned().collect();
    info!("df_valid rows: {}", valid.len());
    valid
}
