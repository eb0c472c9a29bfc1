use log::info;
use std::cmp::Ordering;

use crate::records::{DailyKeyed, Table};

/// Order by subject then day, with missing values after present ones.
pub fn key_order<T: DailyKeyed>(a: &T, b: &T) -> Ordering {
    fn nulls_last<V: Ord>(a: Option<V>, b: Option<V>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
    nulls_last(a.subject(), b.subject()).then_with(|| nulls_last(a.day(), b.day()))
}

/// Stable-sort by (subject, day) and keep the first row of every key.
///
/// Tables missing a key column are returned untouched.
pub fn dedup_daily<T: DailyKeyed>(name: &str, table: Table<T>) -> Table<T> {
    if !table.keyed {
        return table;
    }
    let before = table.len();
    let mut rows = table.rows;
    rows.sort_by(key_order);
    rows.dedup_by(|later, earlier| {
        later.subject() == earlier.subject() && later.day() == earlier.day()
    });
    if rows.len() < before {
        info!("{}: dropped {} duplicate subject-day rows", name, before - rows.len());
    }
    Table { rows, keyed: true }
}
