//! PNG charts of the report tables.
//!
//! Charts carry no text, so rendering needs no system fonts and the same
//! inputs always produce the same bytes.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use polars::prelude::{DataFrame, PolarsResult};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::join::AnalysisRow;
use crate::output::DATE_FORMAT;

pub const PLOT_DIR: &str = "plots";

/// Most points drawn in a scatter chart.
pub const SAMPLE_LIMIT: usize = 3000;
const SLEEP_BINS: usize = 30;
const SLEEP_TARGET_MINUTES: f64 = 420.0;
const WEEKDAY_ORDER: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MARGIN: i32 = 20;
const WIDE: (u32, u32) = (1000, 400);
const SQUARE: (u32, u32) = (700, 500);

const BLUE_TONE: RGBColor = RGBColor(31, 119, 180);
const ORANGE_TONE: RGBColor = RGBColor(255, 127, 14);
const GREEN_TONE: RGBColor = RGBColor(44, 160, 44);
const SERIES_COLORS: [RGBColor; 3] = [BLUE_TONE, ORANGE_TONE, GREEN_TONE];

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn floats(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    Ok(frame
        .column(name)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .collect())
}

fn strings(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    Ok(frame
        .column(name)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Every `stride`-th row, with the stride chosen so at most `limit` rows remain.
pub fn deterministic_sample<T>(rows: &[T], limit: usize) -> Vec<&T> {
    let stride = rows.len().div_ceil(limit.max(1)).max(1);
    rows.iter().step_by(stride).collect()
}

/// Ordinary least squares `(slope, intercept)`; `None` without spread in x.
pub fn least_squares(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn padded((lo, hi): (f64, f64)) -> Range<f64> {
    let pad = if hi > lo {
        (hi - lo) * 0.05
    } else {
        lo.abs().max(1.0) * 0.05
    };
    (lo - pad)..(hi + pad)
}

/// A value axis that starts at zero, for bars.
fn from_zero(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = extent(values).unwrap_or((0.0, 0.0));
    let lo = lo.min(0.0);
    let hi = hi.max(0.0);
    if hi > lo {
        lo..hi + (hi - lo) * 0.05
    } else {
        0.0..1.0
    }
}

fn canvas(path: &Path, size: (u32, u32)) -> Result<Canvas<'_>> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    Ok(root)
}

/// Frame the plotting region of `area`, which sits `MARGIN` pixels in.
fn outline(area: &Canvas<'_>) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    area.draw(&Rectangle::new(
        [(MARGIN, MARGIN), (w as i32 - MARGIN, h as i32 - MARGIN)],
        BLACK.stroke_width(1),
    ))?;
    Ok(())
}

fn line_chart(path: &Path, points: Vec<(f64, f64)>, color: RGBColor) -> Result<bool> {
    let (Some(x), Some(y)) = (
        extent(points.iter().map(|p| p.0)),
        extent(points.iter().map(|p| p.1)),
    ) else {
        return Ok(false);
    };

    let root = canvas(path, WIDE)?;
    outline(&root)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .build_cartesian_2d(padded(x), padded(y))?;
    chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?;
    root.present()?;
    Ok(true)
}

fn scatter_with_fit(path: &Path, points: Vec<(f64, f64)>, color: RGBColor) -> Result<bool> {
    let (Some(x), Some(y)) = (
        extent(points.iter().map(|p| p.0)),
        extent(points.iter().map(|p| p.1)),
    ) else {
        return Ok(false);
    };
    let x_range = padded(x);

    let root = canvas(path, SQUARE)?;
    outline(&root)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .build_cartesian_2d(x_range.clone(), padded(y))?;
    chart.draw_series(
        points
            .iter()
            .map(|&p| Circle::new(p, 2, color.mix(0.3).filled())),
    )?;
    if let Some((slope, intercept)) = least_squares(&points) {
        let ends = [x_range.start, x_range.end];
        chart.draw_series(LineSeries::new(
            ends.map(|x| (x, slope * x + intercept)),
            RED.stroke_width(2),
        ))?;
    }
    root.present()?;
    Ok(true)
}

/// Bars at slots `0..values.len()`, missing values left empty.
fn bar_panel(area: &Canvas<'_>, values: &[Option<f64>], color: RGBColor) -> Result<()> {
    outline(area)?;
    let mut chart = ChartBuilder::on(area).margin(MARGIN).build_cartesian_2d(
        0.0..values.len() as f64,
        from_zero(values.iter().flatten().copied()),
    )?;
    chart.draw_series(values.iter().enumerate().filter_map(|(i, v)| {
        let x = i as f64;
        v.map(|v| Rectangle::new([(x + 0.15, 0.0), (x + 0.85, v)], color.filled()))
    }))?;
    Ok(())
}

fn weekday_bars(path: &Path, by_weekday: &DataFrame) -> Result<bool> {
    if by_weekday.height() == 0 {
        return Ok(false);
    }
    let names = strings(by_weekday, "weekday")?;
    let in_week_order = |column: &str| -> PolarsResult<Vec<Option<f64>>> {
        let values = floats(by_weekday, column)?;
        Ok(WEEKDAY_ORDER
            .iter()
            .map(|day| {
                names
                    .iter()
                    .position(|n| n.as_deref() == Some(*day))
                    .and_then(|i| values[i])
            })
            .collect())
    };
    let steps = in_week_order("TotalSteps")?;
    let asleep = in_week_order("TotalMinutesAsleep")?;

    let root = canvas(path, (1200, 400))?;
    let (left, right) = root.split_horizontally(600);
    bar_panel(&left, &steps, BLUE_TONE)?;
    bar_panel(&right, &asleep, GREEN_TONE)?;
    root.present()?;
    Ok(true)
}

/// One group per metric, one bar per step bucket inside each group.
fn segment_bars(path: &Path, segments: &DataFrame) -> Result<bool> {
    let buckets = segments.height();
    if buckets == 0 {
        return Ok(false);
    }
    let metrics = ["Calories", "TotalMinutesAsleep", "SedentaryMinutes"];
    let groups = metrics
        .iter()
        .map(|m| floats(segments, m))
        .collect::<PolarsResult<Vec<_>>>()?;

    let root = canvas(path, WIDE)?;
    outline(&root)?;
    let mut chart = ChartBuilder::on(&root).margin(MARGIN).build_cartesian_2d(
        0.0..metrics.len() as f64,
        from_zero(groups.iter().flatten().flatten().copied()),
    )?;
    let width = 0.8 / buckets as f64;
    for (g, values) in groups.iter().enumerate() {
        chart.draw_series(values.iter().enumerate().filter_map(|(b, v)| {
            let x0 = g as f64 + 0.1 + b as f64 * width;
            let color = SERIES_COLORS[b % SERIES_COLORS.len()];
            v.map(|v| Rectangle::new([(x0, 0.0), (x0 + width, v)], color.filled()))
        }))?;
    }
    root.present()?;
    Ok(true)
}

/// Equal-width bin counts over `lo..=hi`; the top edge falls in the last bin.
pub fn histogram(values: &[f64], bins: usize, lo: f64, hi: f64) -> Vec<u32> {
    let mut counts = vec![0; bins];
    if bins == 0 {
        return counts;
    }
    let width = (hi - lo) / bins as f64;
    for v in values {
        let idx = if width > 0.0 {
            (((v - lo) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }
    counts
}

fn sleep_histogram(path: &Path, asleep: &[f64]) -> Result<bool> {
    let Some((lo, hi)) = extent(asleep.iter().copied()) else {
        return Ok(false);
    };
    let hi = if hi > lo { hi } else { lo + 1.0 };
    let counts = histogram(asleep, SLEEP_BINS, lo, hi);
    let width = (hi - lo) / SLEEP_BINS as f64;
    let top = counts.iter().copied().max().unwrap_or(0) as f64;

    let x = (lo.min(SLEEP_TARGET_MINUTES), hi.max(SLEEP_TARGET_MINUTES));
    let root = canvas(path, SQUARE)?;
    outline(&root)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .build_cartesian_2d(padded(x), from_zero([top]))?;
    chart.draw_series(counts.iter().enumerate().map(|(i, &c)| {
        let x0 = lo + i as f64 * width;
        Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], BLUE_TONE.filled())
    }))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(SLEEP_TARGET_MINUTES, 0.0), (SLEEP_TARGET_MINUTES, top.max(1.0))],
        RED.stroke_width(2),
    )))?;
    root.present()?;
    Ok(true)
}

fn date_points(by_date: &DataFrame, column: &str) -> PolarsResult<Vec<(f64, f64)>> {
    let dates = strings(by_date, "date")?;
    let values = floats(by_date, column)?;
    Ok(dates
        .iter()
        .zip(values)
        .filter_map(|(d, v)| {
            let day = NaiveDate::parse_from_str(d.as_deref()?, DATE_FORMAT).ok()?;
            Some((day.num_days_from_ce() as f64, v?))
        })
        .collect())
}

fn paired(
    rows: &[&AnalysisRow],
    x: impl Fn(&AnalysisRow) -> Option<f64>,
    y: impl Fn(&AnalysisRow) -> Option<f64>,
) -> Vec<(f64, f64)> {
    rows.iter().filter_map(|r| Some((x(r)?, y(r)?))).collect()
}

fn draw(
    written: &mut Vec<PathBuf>,
    path: PathBuf,
    render: impl FnOnce(&Path) -> Result<bool>,
) -> Result<()> {
    if render(&path).with_context(|| format!("Failed to draw {}", path.display()))? {
        info!("Saved: {}", path.display());
        written.push(path);
    }
    Ok(())
}

/// Render every chart that has data into `plot_dir`; returns the files written.
pub fn render_charts(
    plot_dir: &Path,
    by_date: &DataFrame,
    by_weekday: &DataFrame,
    segments: &DataFrame,
    valid_rows: &[AnalysisRow],
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(plot_dir)
        .with_context(|| format!("Failed to create plot directory {}", plot_dir.display()))?;

    let sample = deterministic_sample(valid_rows, SAMPLE_LIMIT);
    let asleep: Vec<f64> = valid_rows
        .iter()
        .filter_map(|r| r.total_minutes_asleep)
        .collect();

    let mut written = Vec::new();
    draw(&mut written, plot_dir.join("steps_over_time.png"), |path| {
        line_chart(path, date_points(by_date, "TotalSteps")?, BLUE_TONE)
    })?;
    draw(&mut written, plot_dir.join("calories_vs_steps.png"), |path| {
        let points = paired(&sample, |r| r.total_steps, |r| r.calories);
        scatter_with_fit(path, points, BLUE_TONE)
    })?;
    draw(&mut written, plot_dir.join("weekday_bars.png"), |path| {
        weekday_bars(path, by_weekday)
    })?;
    draw(&mut written, plot_dir.join("segments_compare.png"), |path| {
        segment_bars(path, segments)
    })?;
    draw(&mut written, plot_dir.join("avg_hr_over_time.png"), |path| {
        line_chart(path, date_points(by_date, "AvgHR")?, ORANGE_TONE)
    })?;
    draw(&mut written, plot_dir.join("sleep_distribution.png"), |path| {
        sleep_histogram(path, &asleep)
    })?;
    draw(&mut written, plot_dir.join("sedentary_vs_steps.png"), |path| {
        let points = paired(&sample, |r| r.total_steps, |r| r.sedentary_minutes);
        scatter_with_fit(path, points, GREEN_TONE)
    })?;

    Ok(written)
}
