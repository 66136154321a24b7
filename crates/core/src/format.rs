//! Number formatting for human-readable descriptions.

/// Maximum fraction digits kept when rendering a grouped number.
const MAX_FRACTION_DIGITS: usize = 3;

/// Format a number with `ru-RU` style grouping: thousands separated by a
/// space, decimal comma, at most three fraction digits, trailing zeros
/// dropped.
///
/// `1500000.0` renders as `"1 500 000"`, `1234.5` as `"1 234,5"`.
pub fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.*}", MAX_FRACTION_DIGITS, value.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push(',');
        out.push_str(frac_part);
    }
    out
}
