use log::{info, warn};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data_loading::{load_source, RawTable, SourceLoad};
use crate::dedup::dedup_daily;
use crate::heart_rate::{aggregate_daily, HeartRateDailyAggregate};
use crate::identifiers::normalize_ids;
use crate::join::{join_sources, AnalysisRow};
use crate::quality::{apply_quality_flags, valid_rows};
use crate::records::{self, Table, WeightRecord};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceSummary {
    pub name: String,
    pub status: String,
    pub rows: usize,
    /// Rows whose timestamp matched none of the source's formats.
    pub unparsed_days: usize,
}

/// Everything the core hands to reporting.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Every joined row, flagged but not filtered.
    pub analysis: Vec<AnalysisRow>,
    pub heart_rate_daily: Vec<HeartRateDailyAggregate>,
    pub weight: Table<WeightRecord>,
    pub calories_median: Option<f64>,
    pub sources: Vec<SourceSummary>,
}

impl PipelineOutput {
    pub fn valid_rows(&self) -> Vec<AnalysisRow> {
        valid_rows(&self.analysis)
    }
}

fn load_normalized(name: &str, path: &std::path::Path, id_column: &str) -> SourceLoad {
    match load_source(name, path) {
        SourceLoad::Loaded(mut table) => {
            normalize_ids(&mut table, id_column);
            SourceLoad::Loaded(table)
        }
        other => other,
    }
}

fn summarize<T: records::DailyKeyed>(
    name: &str,
    load: &SourceLoad,
    table: &Table<T>,
) -> SourceSummary {
    SourceSummary {
        name: name.to_string(),
        status: load.status().to_string(),
        rows: load.table().map_or(0, RawTable::len),
        unparsed_days: table.rows.iter().filter(|r| r.day().is_none()).count(),
    }
}

/// Run loader through quality filter. Never fails: absent sources and bad
/// cells degrade to empty tables and nulls.
pub fn run(config: &PipelineConfig) -> PipelineOutput {
    let columns = &config.columns;

    let daily_load = load_normalized("daily", &config.daily_path, &columns.id);
    let sleep_load = load_normalized("sleep", &config.sleep_path, &columns.id);
    let weight_load = load_normalized("weight", &config.weight_path, &columns.id);
    let heart_load = load_normalized("heart", &config.heart_path, &columns.id);

    let activity = daily_load
        .table()
        .map(|t| records::daily_activity(t, columns))
        .unwrap_or_default();
    let sleep = sleep_load
        .table()
        .map(|t| records::sleep(t, columns))
        .unwrap_or_default();
    let weight = weight_load
        .table()
        .map(|t| records::weight(t, columns))
        .unwrap_or_default();
    let heart = heart_load
        .table()
        .map(|t| records::heart_rate(t, columns))
        .unwrap_or_default();

    let sources = vec![
        summarize("daily", &daily_load, &activity),
        summarize("sleep", &sleep_load, &sleep),
        summarize("weight", &weight_load, &weight),
        summarize("heart", &heart_load, &heart),
    ];
    if weight.rows.iter().any(|w| w.day.is_none()) {
        warn!("weight: {} rows with unparseable dates", sources[2].unparsed_days);
    }

    let activity = dedup_daily("daily", activity);
    let sleep = dedup_daily("sleep", sleep);

    let heart_rate_daily = aggregate_daily(&heart);

    let mut analysis = join_sources(&activity, &sleep, &heart_rate_daily);
    let calories_median = apply_quality_flags(&mut analysis);
    info!("Analysis rows: {}", analysis.len());

    PipelineOutput {
        analysis,
        heart_rate_daily,
        weight,
        calories_median,
        sources,
    }
}
