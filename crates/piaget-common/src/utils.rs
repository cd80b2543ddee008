//! Small text and date helpers shared across crates.

use chrono::NaiveDate;

/// Date formats accepted from forms and spreadsheets, ISO first.
const BIRTH_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Returns the trimmed value, or `None` for blank input.
pub fn non_empty_trimmed(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Parses a birth date written as `YYYY-MM-DD` or `DD/MM/YYYY`.
pub fn parse_birth_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    BIRTH_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Normalizes a birth date to the stored ISO form.
pub fn normalize_birth_date(s: &str) -> Option<String> {
    parse_birth_date(s).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Formats a stored ISO date the way it is printed on documents (`DD/MM/YYYY`).
///
/// Values that do not parse are returned unchanged.
pub fn format_date_br(s: &str) -> String {
    match parse_birth_date(s) {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => s.to_string(),
    }
}

/// Lowercases and collapses inner whitespace of a spreadsheet header.
pub fn normalize_key(s: &str) -> String {
    s.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
