//! Amount parsing for observed and captured totals.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a monetary amount such as `"$1,234.50"`, `"1234,50"` or `"500"`.
///
/// Currency symbols and spaces are ignored. When both `,` and `.` occur the
/// one appearing last is the decimal separator. A lone `,` followed by
/// exactly three digits is a thousands separator, otherwise a decimal one.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(c), None) => {
            let grouped = cleaned.matches(',').count() > 1 || cleaned.len() - c - 1 == 3;
            if grouped {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (None, _) => cleaned,
    };

    Decimal::from_str(&normalized).ok()
}

/// Whether two amount strings denote the same value.
pub fn amounts_agree(a: &str, b: &str) -> bool {
    match (parse_amount(a), parse_amount(b)) {
        (Some(x), Some(y)) => x.normalize() == y.normalize(),
        _ => false,
    }
}
