//! Normalizes raw OCR text into field values.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::FieldKind;

/// First run of digits.
const DIGITS_PATTERN: &str = r"(\d+)";

/// First run of digits with an optional decimal fraction and magnitude
/// suffix: 45.6M, 12K, 7.
const MAGNITUDE_PATTERN: &str = r"(\d+\.?\d*[KM]?)";

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DIGITS_PATTERN).expect("invalid regex"))
}

fn magnitude_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MAGNITUDE_PATTERN).expect("invalid regex"))
}

/// Extracts the field value from raw OCR text.
///
/// Unmatched text yields an empty value rather than an error; a record
/// with some blank fields is still worth emitting.
pub fn parse_field(kind: FieldKind, raw: &str) -> String {
    match kind {
        FieldKind::Text => raw.trim().to_string(),
        FieldKind::Digits => first_match(digits_re(), raw),
        FieldKind::Magnitude => first_match(magnitude_re(), raw),
    }
}

fn first_match(re: &Regex, raw: &str) -> String {
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
