//! Value formatting helpers shared by provider parameter builders
//!
//! The request engine expects pre-formatted string values; these helpers
//! render coordinates, booleans, and delimited lists the way the routing
//! APIs read them.

/// Render a float with enough precision for coordinates (6 decimal places),
/// trimming trailing zeros.
pub fn format_float(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Render a bool the way query strings expect it.
pub fn format_bool(value: bool) -> String {
    value.to_string()
}

/// Join values into a single delimited parameter value.
pub fn delimit_list<T: ToString>(values: &[T], delimiter: &str) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// Render a (longitude, latitude) pair as the `"lat,lng"` string the APIs
/// expect. Note the axis swap.
pub fn format_coordinate(coordinate: &(f64, f64)) -> String {
    let (lng, lat) = coordinate;
    format!("{},{}", format_float(*lat), format_float(*lng))
}
