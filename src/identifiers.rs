use crate::data_loading::RawTable;
use log::debug;

/// Canonical token for identifiers that are not whole numbers.
pub const UNKNOWN_SUBJECT: &str = "<NA>";

/// Canonicalize one raw identifier cell.
///
/// Numeric values (including integral floats such as `"1503960366.0"`) render
/// as their integer digits; anything else maps to [`UNKNOWN_SUBJECT`].
pub fn normalize_subject(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n.to_string();
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (f as i64).to_string()
        }
        _ => UNKNOWN_SUBJECT.to_string(),
    }
}

/// Rewrite the identifier column in place. Tables without one are left alone.
pub fn normalize_ids(table: &mut RawTable, id_column: &str) {
    let Some(values) = table.column(id_column) else {
        return;
    };
    let normalized: Vec<String> = values.into_iter().map(normalize_subject).collect();
    let unknown = normalized.iter().filter(|v| *v == UNKNOWN_SUBJECT).count();
    if unknown > 0 {
        debug!("{} identifiers could not be read as numbers", unknown);
    }
    table.replace_column(id_column, normalized);
}
