//! Date normalization for observed and captured dates.

use chrono::NaiveDate;

const NUMERIC_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%m-%d-%Y", "%d/%m/%y",
    "%m/%d/%y", "%d-%m-%y", "%m-%d-%y",
];

const LONG_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y"];

/// All calendar dates a string may denote.
///
/// Day/month order is ambiguous for slash and dash dates, so both readings
/// are returned when valid.
pub fn date_readings(s: &str) -> Vec<NaiveDate> {
    let s = s.trim();
    let mut readings = Vec::new();

    for format in NUMERIC_FORMATS.iter().chain(LONG_FORMATS) {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            if !readings.contains(&date) {
                readings.push(date);
            }
        }
    }

    readings
}

/// Whether two date strings can denote the same calendar date.
pub fn dates_agree(a: &str, b: &str) -> bool {
    let left = date_readings(a);
    if left.is_empty() {
        return false;
    }
    date_readings(b).iter().any(|d| left.contains(d))
}
