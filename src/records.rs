use chrono::NaiveDate;
use log::{debug, warn};

use crate::config::ColumnNames;
use crate::data_loading::RawTable;
use crate::temporal::{self, ACTIVITY_FORMATS, TIMESTAMP_FORMATS};

/// Typed rows of one source. `keyed` records whether both the subject and
/// the day column were present, which gates deduplication.
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub rows: Vec<T>,
    pub keyed: bool,
}

impl<T> Table<T> {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            keyed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Rows addressable by the (subject, day) join key.
pub trait DailyKeyed {
    fn subject(&self) -> Option<&str>;
    fn day(&self) -> Option<NaiveDate>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyActivityRecord {
    pub subject: Option<String>,
    pub day: Option<NaiveDate>,
    pub total_steps: Option<f64>,
    pub calories: Option<f64>,
    pub sedentary_minutes: Option<f64>,
    pub very_active_minutes: Option<f64>,
    pub lightly_active_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SleepRecord {
    pub subject: Option<String>,
    pub day: Option<NaiveDate>,
    pub sleep_timestamp: Option<String>,
    pub total_minutes_asleep: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    pub subject: Option<String>,
    pub day: Option<NaiveDate>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateSample {
    pub subject: Option<String>,
    pub day: Option<NaiveDate>,
    pub value: Option<f64>,
}

macro_rules! impl_daily_keyed {
    ($($ty:ty),*) => {
        $(impl DailyKeyed for $ty {
            fn subject(&self) -> Option<&str> {
                self.subject.as_deref()
            }

            fn day(&self) -> Option<NaiveDate> {
                self.day
            }
        })*
    };
}

impl_daily_keyed!(DailyActivityRecord, SleepRecord, WeightRecord, HeartRateSample);

/// Coerce a cell to a number; blanks and text become `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn text_column(table: &RawTable, name: &str) -> Vec<Option<String>> {
    match table.column(name) {
        Some(values) => values.into_iter().map(|v| Some(v.to_string())).collect(),
        None => vec![None; table.len()],
    }
}

fn numeric_column(table: &RawTable, name: &str) -> Vec<Option<f64>> {
    match table.column(name) {
        Some(values) => {
            let parsed: Vec<Option<f64>> = values.iter().map(|v| parse_number(v)).collect();
            let failed = values
                .iter()
                .zip(&parsed)
                .filter(|(raw, p)| p.is_none() && !raw.trim().is_empty())
                .count();
            if failed > 0 {
                debug!("{}: {} non-numeric values coerced to null", name, failed);
            }
            parsed
        }
        None => vec![None; table.len()],
    }
}

fn days(
    table: &RawTable,
    column: Option<&str>,
    formats: &[temporal::DayFormat],
) -> Vec<Option<NaiveDate>> {
    let parsed = column
        .and_then(|c| temporal::day_column(table, c, formats))
        .unwrap_or_else(|| vec![None; table.len()]);
    let unparsed = parsed.iter().filter(|d| d.is_none()).count();
    if unparsed > 0 && column.is_some_and(|c| table.has_column(c)) {
        debug!("{} timestamps could not be parsed", unparsed);
    }
    parsed
}

fn is_keyed(table: &RawTable, columns: &ColumnNames, day_column: Option<&str>) -> bool {
    table.has_column(&columns.id) && day_column.is_some_and(|c| table.has_column(c))
}

pub fn daily_activity(table: &RawTable, columns: &ColumnNames) -> Table<DailyActivityRecord> {
    let subjects = text_column(table, &columns.id);
    let days = days(table, Some(columns.activity_date.as_str()), ACTIVITY_FORMATS);
    let steps = numeric_column(table, &columns.total_steps);
    let calories = numeric_column(table, &columns.calories);
    let sedentary = numeric_column(table, &columns.sedentary_minutes);
    let very_active = numeric_column(table, &columns.very_active_minutes);
    let lightly_active = numeric_column(table, &columns.lightly_active_minutes);

    let rows = (0..table.len())
        .map(|i| DailyActivityRecord {
            subject: subjects[i].clone(),
            day: days[i],
            total_steps: steps[i],
            calories: calories[i],
            sedentary_minutes: sedentary[i],
            very_active_minutes: very_active[i],
            lightly_active_minutes: lightly_active[i],
        })
        .collect();

    Table {
        rows,
        keyed: is_keyed(table, columns, Some(columns.activity_date.as_str())),
    }
}

pub fn sleep(table: &RawTable, columns: &ColumnNames) -> Table<SleepRecord> {
    let subjects = text_column(table, &columns.id);
    let days = days(table, Some(columns.sleep_day.as_str()), TIMESTAMP_FORMATS);
    let stamps = text_column(table, &columns.sleep_day);
    let asleep = numeric_column(table, &columns.total_minutes_asleep);

    let rows = (0..table.len())
        .map(|i| SleepRecord {
            subject: subjects[i].clone(),
            day: days[i],
            sleep_timestamp: stamps[i].clone(),
            total_minutes_asleep: asleep[i],
        })
        .collect();

    Table {
        rows,
        keyed: is_keyed(table, columns, Some(columns.sleep_day.as_str())),
    }
}

pub fn weight(table: &RawTable, columns: &ColumnNames) -> Table<WeightRecord> {
    let subjects = text_column(table, &columns.id);
    let days = days(table, Some(columns.weight_date.as_str()), TIMESTAMP_FORMATS);
    let stamps = text_column(table, &columns.weight_date);

    let rows = (0..table.len())
        .map(|i| WeightRecord {
            subject: subjects[i].clone(),
            day: days[i],
            timestamp: stamps[i].clone(),
        })
        .collect();

    Table {
        rows,
        keyed: is_keyed(table, columns, Some(columns.weight_date.as_str())),
    }
}

pub fn heart_rate(table: &RawTable, columns: &ColumnNames) -> Table<HeartRateSample> {
    let time_column = temporal::probe_column(table, &columns.heart_time_candidates);
    if time_column.is_none() {
        warn!(
            "Heart file missing {} column",
            columns.heart_time_candidates.join("/")
        );
    }
    let subjects = text_column(table, &columns.id);
    let days = days(table, time_column, TIMESTAMP_FORMATS);
    let values = numeric_column(table, &columns.heart_value);

    let rows = (0..table.len())
        .map(|i| HeartRateSample {
            subject: subjects[i].clone(),
            day: days[i],
            value: values[i],
        })
        .collect();

    Table {
        rows,
        keyed: is_keyed(table, columns, time_column),
    }
}
