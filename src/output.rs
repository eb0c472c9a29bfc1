use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::heart_rate::{round1, HeartRateDailyAggregate};
use crate::join::AnalysisRow;
use crate::pipeline::{PipelineOutput, SourceSummary};
use crate::plots;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Step-count buckets, inclusive upper bounds. The lowest bound is inclusive too.
const STEP_BUCKETS: [(&str, f64); 3] = [
    ("<5k", 5000.0),
    ("5k-10k", 10000.0),
    (">10k", f64::INFINITY),
];
const STEP_BUCKET_FLOOR: f64 = -1.0;

pub fn steps_bucket(steps: Option<f64>) -> Option<(i64, &'static str)> {
    let steps = steps?;
    if steps < STEP_BUCKET_FLOOR {
        return None;
    }
    STEP_BUCKETS
        .iter()
        .enumerate()
        .find(|(_, (_, upper))| steps <= *upper)
        .map(|(rank, (label, _))| (rank as i64, *label))
}

fn f64_column(
    rows: &[AnalysisRow],
    field: impl Fn(&AnalysisRow) -> Option<f64>,
) -> Vec<Option<f64>> {
    rows.iter().map(field).collect()
}

pub fn analysis_frame(rows: &[AnalysisRow]) -> PolarsResult<DataFrame> {
    let ids: Vec<Option<String>> = rows.iter().map(|r| r.subject.clone()).collect();
    let dates: Vec<Option<String>> = rows
        .iter()
        .map(|r| r.day.map(|d| d.format(DATE_FORMAT).to_string()))
        .collect();
    let hr_count: Vec<Option<u32>> = rows.iter().map(|r| r.hr_count).collect();
    let weekdays: Vec<Option<String>> = rows.iter().map(|r| r.weekday.clone()).collect();
    let zero_step: Vec<bool> = rows.iter().map(|r| r.zero_step_high_cal).collect();
    let valid: Vec<bool> = rows.iter().map(|r| r.valid_row).collect();

    df!(
        "Id" => ids,
        "date" => dates,
        "TotalSteps" => f64_column(rows, |r| r.total_steps),
        "Calories" => f64_column(rows, |r| r.calories),
        "SedentaryMinutes" => f64_column(rows, |r| r.sedentary_minutes),
        "VeryActiveMinutes" => f64_column(rows, |r| r.very_active_minutes),
        "LightlyActiveMinutes" => f64_column(rows, |r| r.lightly_active_minutes),
        "TotalMinutesAsleep" => f64_column(rows, |r| r.total_minutes_asleep),
        "AvgHR" => f64_column(rows, |r| r.avg_hr),
        "MaxHR" => f64_column(rows, |r| r.max_hr),
        "MinHR" => f64_column(rows, |r| r.min_hr),
        "HRCount" => hr_count,
        "weekday" => weekdays,
        "zero_step_high_cal" => zero_step,
        "valid_row" => valid
    )
}

pub fn heart_rate_frame(daily: &[HeartRateDailyAggregate]) -> PolarsResult<DataFrame> {
    df!(
        "Id" => daily.iter().map(|h| h.subject.clone()).collect::<Vec<String>>(),
        "date" => daily
            .iter()
            .map(|h| h.day.format(DATE_FORMAT).to_string())
            .collect::<Vec<String>>(),
        "AvgHR" => daily.iter().map(|h| h.avg_hr).collect::<Vec<f64>>(),
        "MaxHR" => daily.iter().map(|h| h.max_hr).collect::<Vec<f64>>(),
        "MinHR" => daily.iter().map(|h| h.min_hr).collect::<Vec<f64>>(),
        "HRCount" => daily.iter().map(|h| h.hr_count).collect::<Vec<u32>>()
    )
}

fn mean_exprs(columns: &[&str]) -> Vec<Expr> {
    columns.iter().map(|c| col(*c).mean()).collect()
}

/// Mean of `columns` per `by` value, null keys dropped, sorted by key.
pub fn group_mean(frame: &DataFrame, by: &str, columns: &[&str]) -> PolarsResult<DataFrame> {
    frame
        .clone()
        .lazy()
        .filter(col(by).is_not_null())
        .group_by([col(by)])
        .agg(mean_exprs(columns))
        .sort([by], SortMultipleOptions::default())
        .collect()
}

pub fn agg_by_date(valid: &DataFrame) -> PolarsResult<DataFrame> {
    group_mean(
        valid,
        "date",
        &[
            "TotalSteps",
            "Calories",
            "SedentaryMinutes",
            "VeryActiveMinutes",
            "LightlyActiveMinutes",
            "TotalMinutesAsleep",
            "AvgHR",
        ],
    )
}

pub fn agg_by_weekday(valid: &DataFrame) -> PolarsResult<DataFrame> {
    group_mean(
        valid,
        "weekday",
        &["TotalSteps", "Calories", "TotalMinutesAsleep", "AvgHR"],
    )
}

/// The valid table plus its `steps_bucket` label, as written to `clean_daily_sleep.csv`.
pub fn clean_frame(valid_rows: &[AnalysisRow]) -> PolarsResult<DataFrame> {
    let mut frame = analysis_frame(valid_rows)?;
    let labels: Vec<Option<&str>> = valid_rows
        .iter()
        .map(|r| steps_bucket(r.total_steps).map(|(_, label)| label))
        .collect();
    frame.with_column(Series::new("steps_bucket".into(), labels))?;
    Ok(frame)
}

/// Round every value of a float column to one decimal, halves to even.
fn round_column(frame: &mut DataFrame, name: &str) -> PolarsResult<()> {
    let rounded: Vec<Option<f64>> = frame
        .column(name)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.map(round1))
        .collect();
    frame.with_column(Series::new(name.into(), rounded))?;
    Ok(())
}

/// Per step-bucket means, rounded to one decimal, in bucket order.
pub fn step_segments(valid_rows: &[AnalysisRow]) -> PolarsResult<DataFrame> {
    let mut frame = clean_frame(valid_rows)?;
    let ranks: Vec<Option<i64>> = valid_rows
        .iter()
        .map(|r| steps_bucket(r.total_steps).map(|(rank, _)| rank))
        .collect();
    frame.with_column(Series::new("bucket_rank".into(), ranks))?;

    let metrics = ["Calories", "TotalMinutesAsleep", "SedentaryMinutes", "AvgHR"];
    let mut selection = vec![col("steps_bucket")];
    selection.extend(metrics.iter().map(|c| col(*c)));

    let mut segments = frame
        .lazy()
        .filter(col("bucket_rank").is_not_null())
        .group_by([col("bucket_rank"), col("steps_bucket")])
        .agg(mean_exprs(&metrics))
        .sort(["bucket_rank"], SortMultipleOptions::default())
        .select(selection)
        .collect()?;
    for metric in metrics {
        round_column(&mut segments, metric)?;
    }
    Ok(segments)
}

pub fn write_frame(frame: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(frame)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved: {}", path.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    sources: &'a [SourceSummary],
    analysis_rows: usize,
    valid_rows: usize,
    heart_rate_days: usize,
    weight_rows: usize,
    calories_median: Option<f64>,
    outputs: Vec<String>,
}

/// Write every report table plus `run_summary.json` into `out_dir`, overwriting.
pub fn write_reports(output: &PipelineOutput, out_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let valid_rows = output.valid_rows();
    let mut valid = clean_frame(&valid_rows).context("Failed to build clean table")?;
    let mut all = analysis_frame(&output.analysis).context("Failed to build audit table")?;
    let mut by_date = agg_by_date(&valid).context("Failed to aggregate by date")?;
    let mut by_weekday = agg_by_weekday(&valid).context("Failed to aggregate by weekday")?;
    let mut segments = step_segments(&valid_rows).context("Failed to summarize step buckets")?;
    let mut heart = heart_rate_frame(&output.heart_rate_daily)
        .context("Failed to build heart-rate table")?;

    let mut written = Vec::new();
    for (frame, name) in [
        (&mut valid, "clean_daily_sleep.csv"),
        (&mut all, "analysis_all_rows.csv"),
        (&mut by_date, "agg_by_date.csv"),
        (&mut by_weekday, "agg_by_weekday.csv"),
        (&mut segments, "segments_steps.csv"),
        (&mut heart, "heartrate_daily.csv"),
    ] {
        let path = out_dir.join(name);
        write_frame(frame, &path)?;
        written.push(path);
    }

    let charts = plots::render_charts(
        &out_dir.join(plots::PLOT_DIR),
        &by_date,
        &by_weekday,
        &segments,
        &valid_rows,
    )
    .context("Failed to render charts")?;

    let summary_path = out_dir.join("run_summary.json");
    let summary = RunSummary {
        sources: &output.sources,
        analysis_rows: output.analysis.len(),
        valid_rows: valid_rows.len(),
        heart_rate_days: output.heart_rate_daily.len(),
        weight_rows: output.weight.len(),
        calories_median: output.calories_median,
        outputs: written
            .iter()
            .chain(&charts)
            .filter_map(|p| p.strip_prefix(out_dir).ok())
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
    };
    let file = File::create(&summary_path)
        .with_context(|| format!("Failed to create {}", summary_path.display()))?;
    serde_json::to_writer_pretty(file, &summary)
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;
    info!("Saved: {}", summary_path.display());
    written.push(summary_path);
    written.extend(charts);

    Ok(written)
}
