//! Value normalizers: numeric tokens, units, cannabinoid ranges and test dates.
//!
//! Pure functions with no dependencies on the rest of the pipeline. Every
//! strategy and the terpene parser route raw tokens through here so range
//! rejection and OCR repair behave identically everywhere.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;

/// 1 mg/g is treated as 0.1 %. Empirical constant; do not re-derive.
pub const MG_PER_G_TO_PERCENT: f64 = 0.1;

/// 1 µg/g is treated as 1/10000 %. Empirical constant; do not re-derive.
pub const UG_PER_G_DIVISOR: f64 = 10_000.0;

/// Upper bounds for accepted cannabinoid values (percent).
pub const MAX_THC_PERCENT: f64 = 50.0;
pub const MAX_CBD_PERCENT: f64 = 30.0;
pub const MAX_TOTAL_CANNABINOIDS_PERCENT: f64 = 60.0;

/// Terpene values must fall strictly inside (0, 20) percent.
pub const MAX_TERPENE_PERCENT: f64 = 20.0;

/// Unit annotation attached to a measured amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Percent,
    MgPerG,
    UgPerG,
}

impl Unit {
    /// Detect a unit anywhere in a cell or header label.
    ///
    /// Micrograms are checked before milligrams so `µg/g` never reads as `g/g`.
    pub fn detect(text: &str) -> Option<Unit> {
        let lower = text.to_lowercase();
        let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.contains("µg/g") || compact.contains("ug/g") || compact.contains("mcg/g") {
            Some(Unit::UgPerG)
        } else if compact.contains("mg/g") {
            Some(Unit::MgPerG)
        } else if compact.contains('%') || compact.contains("percent") {
            Some(Unit::Percent)
        } else {
            None
        }
    }
}

/// Convert a measured value to percent.
pub fn to_percentage(value: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Percent => value,
        Unit::MgPerG => value * MG_PER_G_TO_PERCENT,
        Unit::UgPerG => value / UG_PER_G_DIVISOR,
    }
}

/// Repair common OCR confusions inside a numeric token.
///
/// Only applied when the token already contains at least one real digit, so
/// words like "SOIL" are left alone.
pub fn repair_numeric_token(token: &str) -> String {
    let trimmed = token.trim();
    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }
    trimmed
        .chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'l' | 'I' | '|' => '1',
            'S' => '5',
            'B' => '8',
            ',' => '.',
            other => other,
        })
        .collect()
}

/// Parse a numeric token, tolerating OCR confusions and decimal commas.
///
/// Returns `None` for below-detection markers (`ND`, `<LOQ`, `<LOD`), which
/// are absent measurements, not zero.
pub fn parse_number(token: &str) -> Option<f64> {
    if is_below_detection(token) {
        return None;
    }
    let repaired = repair_numeric_token(token);
    let numeric = repaired.trim_end_matches('%').trim();
    if numeric.is_empty() || numeric.chars().filter(|c| *c == '.').count() > 1 {
        return None;
    }
    if !numeric.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    numeric.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `ND`, `<LOQ`, `<LOD`, `N/D`, `BLQ` and friends.
pub fn is_below_detection(token: &str) -> bool {
    let upper = token.trim().to_uppercase();
    matches!(upper.as_str(), "ND" | "N/D" | "N.D." | "NOT DETECTED" | "BLQ")
        || upper.starts_with("<LOQ")
        || upper.starts_with("< LOQ")
        || upper.starts_with("<LOD")
        || upper.starts_with("< LOD")
}

const BELOW_DETECTION_MARKER: &str = r"<\s*lo[qd]\b|\bn\.d\.|\b(?:nd|n/d|blq|not\s+detected)\b";

static LEADING_BELOW_DETECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^[\s:=|\-]*(?:{BELOW_DETECTION_MARKER})")).unwrap()
});

static ANY_BELOW_DETECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){BELOW_DETECTION_MARKER}")).unwrap());

/// Text that opens with a below-detection marker after label separators,
/// as in the tail of `CBD: ND`.
pub fn starts_with_below_detection(text: &str) -> bool {
    LEADING_BELOW_DETECTION.is_match(text)
}

/// A below-detection marker anywhere in `text`.
pub fn contains_below_detection(text: &str) -> bool {
    ANY_BELOW_DETECTION.is_match(text)
}

pub fn valid_thc(value: f64) -> bool {
    value > 0.0 && value <= MAX_THC_PERCENT
}

pub fn valid_cbd(value: f64) -> bool {
    (0.0..=MAX_CBD_PERCENT).contains(&value)
}

pub fn valid_total_cannabinoids(value: f64) -> bool {
    value > 0.0 && value <= MAX_TOTAL_CANNABINOIDS_PERCENT
}

pub fn valid_terpene(value: f64) -> bool {
    value > 0.0 && value < MAX_TERPENE_PERCENT
}

/// Round to the precision COAs report (three decimals), removing float noise
/// introduced by unit conversion.
pub fn round_percent(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

static TEXT_MONTH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]{3,9})\.?\s+([0-9OolI]{1,2}),?\s+([0-9OolIS]{4})$").unwrap()
});

static DAY_MONTH_YEAR_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([0-9OolI]{1,2})[\s\-/]([a-z]{3,9})\.?[\s\-/,]+([0-9OolIS]{4})$").unwrap()
});

/// Normalize a (possibly OCR-garbled) date fragment to midnight UTC.
///
/// Accepts numeric US and ISO layouts plus textual months. Years outside
/// 2000..=2099 are rejected as misreads.
pub fn normalize_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim().trim_end_matches(['.', ',', ';']);
    if trimmed.is_empty() {
        return None;
    }

    let date = parse_textual_date(trimmed)
        .filter(plausible_year)
        .or_else(|| parse_numeric_date(trimmed))?;
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

fn plausible_year(date: &NaiveDate) -> bool {
    (2000..=2099).contains(&date.year())
}

fn parse_numeric_date(text: &str) -> Option<NaiveDate> {
    let repaired = repair_date_digits(text);
    let formats = [
        "%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y", "%Y/%m/%d", "%m/%d/%y", "%m-%d-%y",
    ];
    // `%Y` happily reads "24" as year 24, so keep trying until a plausible year
    formats
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(&repaired, fmt).ok())
        .find(plausible_year)
}

fn parse_textual_date(text: &str) -> Option<NaiveDate> {
    let (month_word, day, year) = if let Some(caps) = TEXT_MONTH_DATE.captures(text) {
        (caps[1].to_string(), caps[2].to_string(), caps[3].to_string())
    } else if let Some(caps) = DAY_MONTH_YEAR_DATE.captures(text) {
        (caps[2].to_string(), caps[1].to_string(), caps[3].to_string())
    } else {
        return None;
    };

    let month = month_number(&month_word)?;
    let day: u32 = repair_numeric_token(&day).parse().ok()?;
    let year: i32 = repair_numeric_token(&year).parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Like `repair_numeric_token`, but keeps date separators intact.
fn repair_date_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'l' | 'I' | '|' => '1',
            'S' => '5',
            other => other,
        })
        .collect()
}

fn month_number(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    let prefix = lower.get(..3)?;
    let month = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn mg_per_g_is_tenth_of_percent() {
        for v in [0.5, 1.0, 5.1, 12.34, 19.9] {
            assert_eq!(to_percentage(v, Unit::MgPerG), v * 0.1);
        }
    }

    #[test]
    fn ug_per_g_divides_by_ten_thousand() {
        for v in [10.0, 512.0, 5100.0, 12345.0] {
            assert_eq!(to_percentage(v, Unit::UgPerG), v / 10000.0);
        }
    }

    #[test]
    fn percent_is_identity() {
        assert_eq!(to_percentage(0.42, Unit::Percent), 0.42);
    }

    #[test]
    fn unit_detection() {
        assert_eq!(Unit::detect("Amount (mg/g)"), Some(Unit::MgPerG));
        assert_eq!(Unit::detect("Result (µg/g)"), Some(Unit::UgPerG));
        assert_eq!(Unit::detect("Result (ug / g)"), Some(Unit::UgPerG));
        assert_eq!(Unit::detect("Amount %"), Some(Unit::Percent));
        assert_eq!(Unit::detect("LOQ"), None);
    }

    #[test]
    fn repairs_ocr_digit_confusions() {
        assert_eq!(repair_numeric_token("2O.5"), "20.5");
        assert_eq!(repair_numeric_token("l5.3"), "15.3");
        assert_eq!(repair_numeric_token("0,3"), "0.3");
        assert_eq!(repair_numeric_token("1S.2"), "15.2");
    }

    #[test]
    fn leaves_words_alone() {
        assert_eq!(repair_numeric_token("SOIL"), "SOIL");
    }

    #[test]
    fn parses_numbers() {
        assert_eq!(parse_number("24.5"), Some(24.5));
        assert_eq!(parse_number("24.5%"), Some(24.5));
        assert_eq!(parse_number("2O.l"), Some(20.1));
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn below_detection_is_absent_not_zero() {
        assert_eq!(parse_number("ND"), None);
        assert_eq!(parse_number("<LOQ"), None);
        assert_eq!(parse_number("< LOD"), None);
        assert!(is_below_detection("nd"));
        assert!(!is_below_detection("0.00"));
    }

    #[test]
    fn below_detection_markers_in_running_text() {
        assert!(starts_with_below_detection(": ND"));
        assert!(starts_with_below_detection(" | <LOQ | 0.05"));
        assert!(starts_with_below_detection(" = not detected"));
        assert!(!starts_with_below_detection(": 0.3% ND"));
        assert!(!starts_with_below_detection(" and THC"));
        assert!(contains_below_detection("| CBD | ND | 0.05 |"));
        assert!(contains_below_detection("Total CBD <LOQ"));
        assert!(!contains_below_detection("STANDARD AND BLEND"));
    }

    #[test]
    fn cannabinoid_ranges() {
        assert!(valid_thc(24.5));
        assert!(!valid_thc(60.0));
        assert!(!valid_thc(0.0));
        assert!(valid_cbd(0.0));
        assert!(valid_cbd(0.3));
        assert!(!valid_cbd(31.0));
        assert!(valid_total_cannabinoids(60.0));
        assert!(!valid_total_cannabinoids(60.5));
    }

    #[test]
    fn terpene_range_is_open_interval() {
        assert!(valid_terpene(0.51));
        assert!(!valid_terpene(0.0));
        assert!(!valid_terpene(20.0));
        assert!(!valid_terpene(-1.0));
    }

    #[test]
    fn rounds_conversion_noise() {
        assert_eq!(round_percent(5.1 * 0.1), 0.51);
        assert_eq!(round_percent(0.12345), 0.123);
    }

    #[test]
    fn numeric_dates() {
        assert_eq!(normalize_date("03/15/2024"), Some(midnight(2024, 3, 15)));
        assert_eq!(normalize_date("2024-03-15"), Some(midnight(2024, 3, 15)));
        assert_eq!(normalize_date("03-15-2024"), Some(midnight(2024, 3, 15)));
        assert_eq!(normalize_date("03/15/24"), Some(midnight(2024, 3, 15)));
    }

    #[test]
    fn garbled_numeric_dates() {
        assert_eq!(normalize_date("O3/l5/2O24"), Some(midnight(2024, 3, 15)));
        assert_eq!(normalize_date("12/0l/2023."), Some(midnight(2023, 12, 1)));
    }

    #[test]
    fn textual_dates() {
        assert_eq!(normalize_date("Mar 15, 2024"), Some(midnight(2024, 3, 15)));
        assert_eq!(normalize_date("September 2 2023"), Some(midnight(2023, 9, 2)));
        assert_eq!(normalize_date("15-Mar-2024"), Some(midnight(2024, 3, 15)));
        assert_eq!(normalize_date("l5 Jan 2O24"), Some(midnight(2024, 1, 15)));
    }

    #[test]
    fn rejects_invalid_dates() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("13/45/2024"), None);
        assert_eq!(normalize_date("03/15/1899"), None);
        assert_eq!(normalize_date("Smarch 3, 2024"), None);
    }
}
