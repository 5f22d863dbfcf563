// Field coercion: numeric and categorical views of untyped cells

use crate::data::{CellValue, Record};

/// Numeric view of a cell. Missing, empty, boolean and non-numeric cells are
/// absent, never zero.
pub fn as_number(record: &Record, field: &str) -> Option<f64> {
    match record.get(field)? {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Categorical view of a cell, used as a group key. Missing cells fall back to
/// the empty category.
pub fn as_category(record: &Record, field: &str) -> String {
    match record.get(field) {
        Some(CellValue::Number(n)) => format_number(*n),
        Some(CellValue::Text(s)) => s.clone(),
        Some(CellValue::Bool(b)) => b.to_string(),
        Some(CellValue::Empty) | None => String::new(),
    }
}

/// Shortest decimal form: `4.0` renders as `4`, `70.5` as `70.5`.
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

/// Numeric values of `field` across records, absent cells dropped.
pub fn numeric_values<'a, I>(records: I, field: &str) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter_map(|r| as_number(r, field))
        .collect()
}

/// Paired numeric values for two fields; a record is kept only when both are
/// present.
pub fn numeric_pairs<'a, I>(records: I, x_field: &str, y_field: &str) -> Vec<(f64, f64)>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter_map(|r| Some((as_number(r, x_field)?, as_number(r, y_field)?)))
        .collect()
}
