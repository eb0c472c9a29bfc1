use chrono::{NaiveDate, NaiveDateTime};

use crate::data_loading::RawTable;

/// One way a source may spell its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFormat {
    /// Calendar date with no time of day.
    Date(&'static str),
    /// Date plus time of day; the time is discarded after parsing.
    DateTime(&'static str),
}

impl DayFormat {
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        match self {
            DayFormat::Date(fmt) => NaiveDate::parse_from_str(raw, fmt).ok(),
            DayFormat::DateTime(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
                .ok()
                .map(|dt| dt.date()),
        }
    }
}

pub const ACTIVITY_FORMATS: &[DayFormat] = &[
    DayFormat::Date("%m/%d/%Y"),
    DayFormat::Date("%Y-%m-%d"),
];

/// Sleep, weight and heart-rate exports: 12-hour clock first, 24-hour fallback.
pub const TIMESTAMP_FORMATS: &[DayFormat] = &[
    DayFormat::DateTime("%m/%d/%Y %I:%M:%S %p"),
    DayFormat::DateTime("%m/%d/%Y %H:%M:%S"),
];

/// First candidate that parses wins; `None` when all fail.
pub fn parse_day(raw: &str, candidates: &[DayFormat]) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    candidates.iter().find_map(|fmt| fmt.parse(raw))
}

/// Parsed days for `column`, or `None` if the table lacks it.
pub fn day_column(
    table: &RawTable,
    column: &str,
    candidates: &[DayFormat],
) -> Option<Vec<Option<NaiveDate>>> {
    table
        .column(column)
        .map(|values| values.into_iter().map(|v| parse_day(v, candidates)).collect())
}

/// First of `candidates` present in the table.
pub fn probe_column<'a>(table: &RawTable, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .find(|name| table.has_column(name))
        .map(String::as_str)
}

pub fn weekday_name(day: NaiveDate) -> String {
    day.format("%A").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::StringRecord;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn activity_dates_parse() {
        assert_eq!(parse_day("4/12/2016", ACTIVITY_FORMATS), Some(ymd(2016, 4, 12)));
        assert_eq!(parse_day("04/02/2016", ACTIVITY_FORMATS), Some(ymd(2016, 4, 2)));
        assert_eq!(parse_day("2016-04-12", ACTIVITY_FORMATS), Some(ymd(2016, 4, 12)));
    }

    #[test]
    fn twelve_hour_clock_truncates_to_day() {
        assert_eq!(
            parse_day("4/12/2016 11:59:59 PM", TIMESTAMP_FORMATS),
            Some(ymd(2016, 4, 12))
        );
        assert_eq!(
            parse_day("4/12/2016 12:00:00 AM", TIMESTAMP_FORMATS),
            Some(ymd(2016, 4, 12))
        );
    }

    #[test]
    fn falls_back_to_twenty_four_hour_clock() {
        assert_eq!(
            parse_day("4/12/2016 23:15:00", TIMESTAMP_FORMATS),
            Some(ymd(2016, 4, 12))
        );
    }

    #[test]
    fn exhausted_candidates_yield_none() {
        assert_eq!(parse_day("yesterday", TIMESTAMP_FORMATS), None);
        assert_eq!(parse_day("", ACTIVITY_FORMATS), None);
        assert_eq!(parse_day("13/45/2016", ACTIVITY_FORMATS), None);
    }

    #[test]
    fn probes_alternate_time_column() {
        let table = RawTable::new(
            vec!["Id".into(), "ActivitySecond".into(), "Value".into()],
            vec![StringRecord::from(vec!["1", "4/12/2016 7:21:00 AM", "97"])],
        );
        let candidates = vec!["Time".to_string(), "ActivitySecond".to_string()];
        assert_eq!(probe_column(&table, &candidates), Some("ActivitySecond"));
        assert_eq!(probe_column(&table, &candidates[..1]), None);
    }

    #[test]
    fn weekday_names_are_english() {
        assert_eq!(weekday_name(ymd(2016, 4, 12)), "Tuesday");
    }
}
