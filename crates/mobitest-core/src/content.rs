//! Structured values from element description text.
//!
//! Mobile apps often pack several values into one accessibility description
//! (`content-desc` on Android), one per line, e.g. a stock row reads
//! `"NIFTY 50\nNSE\n₹22,147.90\n+0.42%"`. These helpers pull values back out.
//! All functions are pure.

use std::sync::OnceLock;

use regex::Regex;

/// Optional minus, a currency glyph, then a numeric run on the same line.
const PRICE_PATTERN: &str = r"-?[ \t]?\p{Sc}[ \t]?\d[\d.,]*";

/// Optional minus, then a numeric run on the same line.
const NUMBER_PATTERN: &str = r"-?[ \t]?\d[\d.,]*";

/// Currency glyphs, thousands separators and whitespace.
const NOISE_PATTERN: &str = r"[\p{Sc},\s]";

fn price_regex() -> &'static Regex {
    static PRICE: OnceLock<Regex> = OnceLock::new();
    PRICE.get_or_init(|| Regex::new(PRICE_PATTERN).expect("price pattern is valid"))
}

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(NUMBER_PATTERN).expect("number pattern is valid"))
}

fn noise_regex() -> &'static Regex {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    NOISE.get_or_init(|| Regex::new(NOISE_PATTERN).expect("noise pattern is valid"))
}

/// Extracts the first price in `text` as a plain numeric string.
///
/// A number carrying a currency glyph wins over any bare number before it;
/// without a glyph anywhere, the first bare number is taken. The currency glyph, thousands separators and whitespace are removed; a
/// leading minus sign is kept. Returns `None` when `text` has no number.
///
/// ```
/// use mobitest_core::content::extract_price;
///
/// assert_eq!(extract_price("₹1,234.50").as_deref(), Some("1234.50"));
/// assert_eq!(extract_price("-₹5").as_deref(), Some("-5"));
/// assert_eq!(extract_price("no price here"), None);
/// ```
pub fn extract_price(text: &str) -> Option<String> {
    let found = price_regex()
        .find(text)
        .or_else(|| number_regex().find(text))?;
    let cleaned = noise_regex().replace_all(found.as_str(), "");
    let cleaned = cleaned.trim_end_matches('.');
    if cleaned.is_empty() || cleaned == "-" {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Parses an extracted price string as a number.
pub fn price_number(text: &str) -> Option<f64> {
    extract_price(text)?.parse().ok()
}

/// Raises `value` by `percent` (negative lowers it), rounded to two decimals.
pub fn adjust_by_percent(value: f64, percent: f64) -> f64 {
    let adjusted = value + value * percent / 100.0;
    (adjusted * 100.0).round() / 100.0
}

/// Parses an attribute value as a boolean: `"true"` in any case is true,
/// anything else is false.
pub fn extract_boolean(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}

/// Splits text on newlines. Trailing empty lines are dropped.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// The line at `index`, if present.
pub fn line_at(text: &str, index: usize) -> Option<&str> {
    split_lines(text).get(index).copied()
}
