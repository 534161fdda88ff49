//! Money parsing and formatting.
//!
//! All prices and bids are carried as integer cents internally; free-form
//! strings ("$24.99", "1,299", " 15 ") are only parsed at the boundary.

/// Parse a money string into cents. Strips currency symbols, commas and
/// whitespace; accepts up to two decimal places. Returns `None` for
/// anything non-numeric.
pub fn parse_money(s: &str) -> Option<i64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some((value * 100.0).round() as i64)
}

/// Format cents as `$x.yy`.
pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}
