// Utility helpers for parsing and basic statistics.
//
// All the "dirty" payload/CSV/number/date handling lives here so the engine
// can assume clean, typed values (or an explicit `None` for unknown).
use chrono::{DateTime, NaiveDate};
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Accepts `Option<&str>` so callers can pass through optional cells.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (an exponent marker
///   is the one exception).
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed or is not finite.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read a JSON value as a finite number. Numeric strings go through
/// [`parse_f64_safe`]; anything else is unknown.
pub fn number_from_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_f64_safe(Some(s)),
        _ => None,
    }
}

/// Invoice dates come as `YYYY-MM-DD`, a full RFC 3339 timestamp, or just a
/// billing month `YYYY-MM` (read as the first of that month).
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice so callers never see NaN.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn round_to(v: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (v * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Like [`format_number`] but drops trailing fractional zeros, so
/// `20000001.0` renders as `20,000,001` and `12.5` stays `12.5`.
pub fn format_compact(n: f64, max_decimals: usize) -> String {
    let s = format_number(n, max_decimals);
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Percent with one decimal and an explicit `+` when the rendered value
/// is above zero.
pub fn format_signed_percent(percent: f64) -> String {
    let body = format!("{:.1}", percent);
    let positive = body.parse::<f64>().is_ok_and(|v| v > 0.0);
    let sign = if positive { "+" } else { "" };
    format!("{}{}%", sign, body)
}

/// [`format_compact`] with as many decimals as needed for a value below
/// `limit` not to render as `limit` or more.
pub fn format_below(n: f64, limit: f64, min_decimals: usize) -> String {
    if n >= limit || !n.is_finite() {
        return format_compact(n, min_decimals);
    }
    (min_decimals..=15)
        .map(|d| format_compact(n, d))
        .find(|text| parse_f64_safe(Some(text.as_str())).is_some_and(|v| v < limit))
        .unwrap_or_else(|| n.to_string())
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Used for counts in console messages (e.g., `1,204 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
