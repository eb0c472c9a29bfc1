use chrono::NaiveDate;
use log::info;
use std::collections::BTreeMap;

use crate::records::{HeartRateSample, Table};

/// One (subject, day) summary of heart-rate samples.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateDailyAggregate {
    pub subject: String,
    pub day: NaiveDate,
    pub avg_hr: f64,
    pub max_hr: f64,
    pub min_hr: f64,
    pub hr_count: u32,
}

/// One decimal place, halves to even.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

struct Accumulator {
    sum: f64,
    max: f64,
    min: f64,
    count: u32,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self {
            sum: value,
            max: value,
            min: value,
            count: 1,
        }
    }

    fn push(&mut self, value: f64) {
        self.sum += value;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
        self.count += 1;
    }
}

/// Collapse samples into per-day mean/max/min/count, ordered by (subject, day).
///
/// Samples lacking a subject, day or value are skipped. An empty input gives
/// an empty result, so joins against it behave the same as a present source.
pub fn aggregate_daily(samples: &Table<HeartRateSample>) -> Vec<HeartRateDailyAggregate> {
    let mut groups: BTreeMap<(&str, NaiveDate), Accumulator> = BTreeMap::new();

    for sample in &samples.rows {
        let (Some(subject), Some(day), Some(value)) =
            (sample.subject.as_deref(), sample.day, sample.value)
        else {
            continue;
        };
        groups
            .entry((subject, day))
            .and_modify(|acc| acc.push(value))
            .or_insert_with(|| Accumulator::new(value));
    }

    let daily: Vec<HeartRateDailyAggregate> = groups
        .into_iter()
        .map(|((subject, day), acc)| HeartRateDailyAggregate {
            subject: subject.to_string(),
            day,
            avg_hr: round1(acc.sum / acc.count as f64),
            max_hr: round1(acc.max),
            min_hr: round1(acc.min),
            hr_count: acc.count,
        })
        .collect();

    info!("hr_day rows: {}", daily.len());
    daily
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(subject: &str, day: u32, value: f64) -> HeartRateSample {
        HeartRateSample {
            subject: Some(subject.to_string()),
            day: NaiveDate::from_ymd_opt(2016, 4, day),
            value: Some(value),
        }
    }

    #[test]
    fn three_samples_collapse_to_one_row() {
        let table = Table {
            rows: vec![sample("1", 12, 60.0), sample("1", 12, 70.0), sample("1", 12, 80.0)],
            keyed: true,
        };
        let daily = aggregate_daily(&table);
        assert_eq!(
            daily,
            [HeartRateDailyAggregate {
                subject: "1".into(),
                day: NaiveDate::from_ymd_opt(2016, 4, 12).unwrap(),
                avg_hr: 70.0,
                max_hr: 80.0,
                min_hr: 60.0,
                hr_count: 3,
            }]
        );
    }

    #[test]
    fn mean_is_rounded_to_one_decimal() {
        let table = Table {
            rows: vec![sample("1", 12, 60.0), sample("1", 12, 61.0), sample("1", 12, 61.0)],
            keyed: true,
        };
        assert_eq!(aggregate_daily(&table)[0].avg_hr, 60.7);
    }

    #[test]
    fn halfway_means_round_to_even() {
        let table = Table {
            rows: vec![
                sample("1", 12, 60.0),
                sample("1", 12, 60.0),
                sample("1", 12, 60.0),
                sample("1", 12, 61.0),
            ],
            keyed: true,
        };
        assert_eq!(aggregate_daily(&table)[0].avg_hr, 60.2);
        assert_eq!(round1(70.75), 70.8);
        assert_eq!(round1(0.25), 0.2);
    }

    #[test]
    fn incomplete_samples_are_skipped() {
        let mut no_day = sample("1", 12, 90.0);
        no_day.day = None;
        let mut no_value = sample("1", 12, 0.0);
        no_value.value = None;
        let table = Table {
            rows: vec![sample("2", 13, 50.0), no_day, no_value, sample("1", 12, 70.0)],
            keyed: true,
        };
        let daily = aggregate_daily(&table);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].subject, "1");
        assert_eq!(daily[0].hr_count, 1);
        assert_eq!(daily[1].subject, "2");
    }

    #[test]
    fn empty_input_gives_empty_aggregate() {
        assert!(aggregate_daily(&Table::empty()).is_empty());
    }
}
