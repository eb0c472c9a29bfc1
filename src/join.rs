use chrono::NaiveDate;
use log::info;
use std::collections::HashMap;

use crate::heart_rate::HeartRateDailyAggregate;
use crate::records::{DailyActivityRecord, SleepRecord, Table};
use crate::temporal::weekday_name;

/// One activity day, left-extended with sleep and heart-rate columns and
/// the quality flags.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRow {
    pub subject: Option<String>,
    pub day: Option<NaiveDate>,
    pub total_steps: Option<f64>,
    pub calories: Option<f64>,
    pub sedentary_minutes: Option<f64>,
    pub very_active_minutes: Option<f64>,
    pub lightly_active_minutes: Option<f64>,
    pub total_minutes_asleep: Option<f64>,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub min_hr: Option<f64>,
    pub hr_count: Option<u32>,
    pub weekday: Option<String>,
    pub zero_step_high_cal: bool,
    pub valid_row: bool,
}

type DayKey<'a> = (&'a str, NaiveDate);

fn key(subject: Option<&str>, day: Option<NaiveDate>) -> Option<(&str, NaiveDate)> {
    Some((subject?, day?))
}

/// Left-join activity with sleep and the heart-rate aggregate on (subject, day).
///
/// Every activity row appears once in the output, in activity order; rows
/// with a missing key half never match. Quality flags start as valid and are
/// set by [`crate::quality::apply_quality_flags`].
pub fn join_sources(
    activity: &Table<DailyActivityRecord>,
    sleep: &Table<SleepRecord>,
    heart_daily: &[HeartRateDailyAggregate],
) -> Vec<AnalysisRow> {
    let mut sleep_by_key: HashMap<DayKey, &SleepRecord> = HashMap::new();
    for row in &sleep.rows {
        if let Some(k) = key(row.subject.as_deref(), row.day) {
            sleep_by_key.entry(k).or_insert(row);
        }
    }

    let mut heart_by_key: HashMap<DayKey, &HeartRateDailyAggregate> = HashMap::new();
    for row in heart_daily {
        heart_by_key.entry((row.subject.as_str(), row.day)).or_insert(row);
    }

    let joined: Vec<AnalysisRow> = activity
        .rows
        .iter()
        .map(|a| {
            let k = key(a.subject.as_deref(), a.day);
            let sleep = k.and_then(|k| sleep_by_key.get(&k).copied());
            let heart = k.and_then(|k| heart_by_key.get(&k).copied());
            AnalysisRow {
                subject: a.subject.clone(),
                day: a.day,
                total_steps: a.total_steps,
                calories: a.calories,
                sedentary_minutes: a.sedentary_minutes,
                very_active_minutes: a.very_active_minutes,
                lightly_active_minutes: a.lightly_active_minutes,
                total_minutes_asleep: sleep.and_then(|s| s.total_minutes_asleep),
                avg_hr: heart.map(|h| h.avg_hr),
                max_hr: heart.map(|h| h.max_hr),
                min_hr: heart.map(|h| h.min_hr),
                hr_count: heart.map(|h| h.hr_count),
                weekday: a.day.map(weekday_name),
                zero_step_high_cal: false,
                valid_row: true,
            }
        })
        .collect();

    let with_sleep = joined
        .iter()
        .filter(|r| r.total_minutes_asleep.is_some())
        .count();
    let with_heart = joined.iter().filter(|r| r.hr_count.is_some()).count();
    info!(
        "Joined {} activity rows ({} with sleep, {} with heart rate)",
        joined.len(),
        with_sleep,
        with_heart
    );
    joined
}
