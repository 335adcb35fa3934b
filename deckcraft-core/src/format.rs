//! Display formatting for extracted values

use crate::record::Scalar;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Excel's day-serial epoch (the 1900 date system, lotus leap bug included
/// by anchoring at 1899-12-30 as every other reader does).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Convert an Excel day serial into a calendar date, dropping time-of-day.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Heuristic over a number-format code: does it render calendar dates?
///
/// Day/year tokens are unambiguous; `m` only counts when the code has no
/// numeric placeholders (which would make it minutes or thousands).
pub fn is_date_format(fmt: &str) -> bool {
    let lower = fmt.to_lowercase();
    if lower.contains("general") {
        return false;
    }
    lower.contains('d')
        || lower.contains('y')
        || (lower.contains('m') && !lower.contains('0') && !lower.contains('#'))
}

/// Render a scalar for slide output.
///
/// Dates become `DD-MM-YYYY`; strings that parse as `YYYY-MM-DD HH:MM:SS`
/// are reformatted the same way, anything else passes through untouched.
pub fn format_value(value: &Scalar) -> String {
    match value {
        Scalar::Null => String::new(),
        Scalar::Date(date) => date.format("%d-%m-%Y").to_string(),
        Scalar::Text(text) => {
            match NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
                Ok(parsed) => parsed.date().format("%d-%m-%Y").to_string(),
                Err(_) => text.clone(),
            }
        }
        Scalar::Number(n) => display_number(*n),
        Scalar::Bool(b) => b.to_string(),
    }
}

/// Numbers that are whole render without a fractional part.
pub fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
