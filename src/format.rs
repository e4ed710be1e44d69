//! Display formatting and tolerant parsing of display strings.
//!
//! Parsing never fails: anything malformed reads as `0` so a single bad
//! record cannot break a whole view.

use std::time::Duration;

const THOUSAND: f64 = 1_000.0;
const MILLION: f64 = 1_000_000.0;
const BILLION: f64 = 1_000_000_000.0;

const SUFFIXES: [(f64, &str); 3] = [(THOUSAND, "K"), (MILLION, "M"), (BILLION, "B")];

/// Compact a magnitude with K/M/B suffixes, e.g. `1234.0 -> "1.2K"`.
pub fn format_compact(value: f64) -> String {
    let value = finite_or_zero(value);
    let abs = value.abs();
    if abs.round() < THOUSAND {
        return format!("{:.0}", value);
    }

    let mut tier = SUFFIXES.iter().rposition(|(scale, _)| abs >= *scale).unwrap_or(0);
    // Just under the next boundary: 999_990 reads "1.0M", not "1000.0K".
    if tier + 1 < SUFFIXES.len() && (abs / SUFFIXES[tier].0 * 10.0).round() >= 10_000.0 {
        tier += 1;
    }

    let (scale, suffix) = SUFFIXES[tier];
    format!("{:.1}{}", value / scale, suffix)
}

/// Dollar volume display, e.g. `"$45.3K"`.
pub fn format_volume(value: f64) -> String {
    format!("${}", format_compact(value))
}

pub fn format_holders(value: u64) -> String {
    format_compact(value as f64)
}

/// Price with precision that keeps sub-cent tokens readable.
pub fn format_price(value: f64) -> String {
    let value = finite_or_zero(value);
    if value >= 1.0 {
        format!("{:.2}", value)
    } else if value >= 0.01 {
        format!("{:.4}", value)
    } else {
        format!("{:.8}", value)
    }
}

pub fn format_usd(value: f64) -> String {
    format!("${}", format_price(value))
}

/// Signed percent change, e.g. `"+12.34%"` or `"-3.10%"`.
pub fn format_change(value: f64) -> String {
    let value = finite_or_zero(value);
    if value >= 0.0 {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}

/// Parse a display number such as `"$1.2K"`, `"+15.3%"` or `"1,204"`.
pub fn parse_numeric(value: &str) -> f64 {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%' | '+' | ' '))
        .collect();

    let (number, multiplier) = match cleaned.chars().last() {
        Some('K') | Some('k') => (&cleaned[..cleaned.len() - 1], THOUSAND),
        Some('M') | Some('m') => (&cleaned[..cleaned.len() - 1], MILLION),
        Some('B') | Some('b') => (&cleaned[..cleaned.len() - 1], BILLION),
        _ => (cleaned.as_str(), 1.0),
    };

    number
        .parse::<f64>()
        .map(|n| finite_or_zero(n * multiplier))
        .unwrap_or(0.0)
}

/// Parse a count such as `"340"` or `"1.2K"`. Negative or malformed input reads as 0.
pub fn parse_integer(value: &str) -> u64 {
    let parsed = parse_numeric(value);
    if parsed <= 0.0 {
        0
    } else {
        parsed.round() as u64
    }
}

/// Listing age in seconds from strings like `"45s"`, `"12m"`, `"3h"` or `"2d"`.
/// A bare number is taken as-is.
pub fn parse_listing_age(value: &str) -> u64 {
    let value = value.trim();
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    let Ok(amount) = digits.parse::<u64>() else {
        return 0;
    };

    let unit = value[digits.len()..].trim().chars().next();
    let scale = match unit {
        Some('s') => 1,
        Some('m') => 60,
        Some('h') => 3_600,
        Some('d') => 86_400,
        _ => 1,
    };
    amount.saturating_mul(scale)
}

/// Label for how long ago the last update arrived.
pub fn time_since_label(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1_000 {
        "now".to_string()
    } else if ms < 60_000 {
        format!("{}s ago", ms / 1_000)
    } else {
        format!("{}m ago", ms / 60_000)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
