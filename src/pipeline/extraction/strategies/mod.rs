//! Extraction strategies.
//!
//! Each strategy is an independent heuristic pass over the whole text that
//! returns a `PartialRecord`. The set and its priority order are fixed:
//! lab-specific (known labs only), structured patterns, numerical ranges,
//! contextual search.

pub mod contextual;
pub mod lab_specific;
pub mod numerical;
pub mod structured;

pub use contextual::ContextualSearchStrategy;
pub use lab_specific::LabSpecificStrategy;
pub use numerical::NumericalRangeStrategy;
pub use structured::StructuredPatternStrategy;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::normalize::{normalize_date, parse_number};
use crate::config::ExtractionConfig;
use crate::models::{LabType, PartialRecord};

/// One heuristic pass. Pure and deterministic; a miss leaves the field absent.
pub trait ExtractionStrategy: Send + Sync {
    fn extract(&self, text: &str) -> PartialRecord;
}

/// Build the ordered strategy list for a detected lab.
pub fn plan_strategies(lab: LabType, config: &ExtractionConfig) -> Vec<Box<dyn ExtractionStrategy>> {
    let mut plan: Vec<Box<dyn ExtractionStrategy>> = Vec::with_capacity(4);
    if let Some(strategy) = LabSpecificStrategy::for_lab(lab, config.lab_terpene_limit) {
        plan.push(Box::new(strategy));
    }
    plan.push(Box::new(StructuredPatternStrategy));
    plan.push(Box::new(NumericalRangeStrategy));
    plan.push(Box::new(ContextualSearchStrategy::new(config.proximity_window)));
    plan
}

/// Percentage number: first character must be a digit, OCR letters tolerated after it.
const PCT_NUMBER: &str = r"(\d[0-9Oo]?(?:[.,][0-9OolI]{1,3})?)";

/// Keyword, up to 15 non-numeric separator characters, number, percent sign.
/// Group `kw` is the keyword, group 2 the number.
fn keyword_percent(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i)(?P<kw>{keyword})[^0-9\n%]{{0,15}}?{PCT_NUMBER}\s*%")).unwrap()
}

pub(crate) const THC_KEYWORD: &str = r"\b(?:total\s+)?(?:(?:delta|Δ|d)[\s\-]?9[\s\-]?)?thc\b";

/// `-A` or ` A` right after a neutral keyword: the acid form (`THC-A`, `CBD A`).
static ACID_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^[\s\-]?a\b").unwrap());

pub(crate) static THC_PERCENT: LazyLock<Regex> = LazyLock::new(|| keyword_percent(THC_KEYWORD));

pub(crate) static CBD_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| keyword_percent(r"\b(?:total\s+)?cbd\b"));

pub(crate) static TOTAL_CANNABINOIDS_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| keyword_percent(r"\btotal\s+(?:active\s+)?cannabinoids?\b"));

static TEST_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:date\s+(?:tested|of\s+analysis|reported|completed|received|collected|sampled)|tested\s+on|test\s+date|analy[sz]ed|completed|reported)\s*(?:on)?\s*[:\-]?\s*([0-9OolI]{1,4}[/\-.][0-9OolI]{1,2}[/\-.][0-9OolIS]{2,4}|[a-z]{3,9}\.?\s+[0-9OolI]{1,2},?\s+[0-9OolIS]{4}|[0-9OolI]{1,2}[\s\-][a-z]{3,9}[\s\-,]+[0-9OolIS]{4})",
    )
    .unwrap()
});

/// True when `rest`, the text following a keyword, turns it into its acid form.
pub(crate) fn acid_suffix_follows(rest: &str) -> bool {
    ACID_SUFFIX.is_match(rest)
}

/// First value captured by a `keyword_percent` regex that passes `valid`.
/// Acid forms of the keyword are skipped.
pub(crate) fn first_valid_percent(re: &Regex, text: &str, valid: fn(f64) -> bool) -> Option<f64> {
    re.captures_iter(text)
        .filter(|caps| {
            caps.name("kw")
                .map_or(true, |kw| !acid_suffix_follows(&text[kw.end()..]))
        })
        .filter_map(|caps| parse_number(caps.get(2)?.as_str()))
        .find(|v| valid(*v))
}

/// First labelled test date that normalizes cleanly.
pub(crate) fn first_test_date(text: &str) -> Option<DateTime<Utc>> {
    TEST_DATE
        .captures_iter(text)
        .find_map(|caps| normalize_date(&caps[1]))
}

/// Clamp a byte range to `text` and widen/narrow it onto char boundaries.
pub(crate) fn char_window(text: &str, start: usize, end: usize) -> &str {
    let mut lo = start.min(text.len());
    while !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = end.min(text.len()).max(lo);
    while !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionMethod;
    use crate::pipeline::extraction::normalize::{valid_cbd, valid_thc, valid_total_cannabinoids};
    use chrono::TimeZone;

    #[test]
    fn plan_for_known_lab_starts_with_lab_specific() {
        let plan = plan_strategies(LabType::TwoRiver, &ExtractionConfig::default());
        assert_eq!(plan.len(), 4);
        let first = plan[0].extract("");
        assert_eq!(first.extraction_method, Some(ExtractionMethod::TwoRiverSpecific));
    }

    #[test]
    fn plan_for_generic_skips_lab_specific() {
        let plan = plan_strategies(LabType::Generic, &ExtractionConfig::default());
        let methods: Vec<_> = plan.iter().map(|s| s.extract("").extraction_method).collect();
        assert_eq!(
            methods,
            vec![
                Some(ExtractionMethod::StructuredPatterns),
                Some(ExtractionMethod::NumericalRanges),
                Some(ExtractionMethod::ContextualSearch),
            ]
        );
    }

    #[test]
    fn thc_pattern_variants() {
        for text in ["THC: 24.5%", "Total THC 24.5 %", "Δ9-THC ... 24.5%", "thc = 24,5%"] {
            assert_eq!(first_valid_percent(&THC_PERCENT, text, valid_thc), Some(24.5), "{text}");
        }
    }

    #[test]
    fn thca_is_not_thc() {
        assert_eq!(first_valid_percent(&THC_PERCENT, "THCA: 26.0%", valid_thc), None);
    }

    #[test]
    fn hyphenated_acid_form_is_not_thc() {
        for text in ["THC-A: 26.0%", "THCa 26.0%", "THC A 26.0%", "Δ9-THC-A 26.0%"] {
            assert_eq!(first_valid_percent(&THC_PERCENT, text, valid_thc), None, "{text}");
        }
        let text = "THC-A: 26.0%\nTHC: 0.8%";
        assert_eq!(first_valid_percent(&THC_PERCENT, text, valid_thc), Some(0.8));
        assert_eq!(first_valid_percent(&CBD_PERCENT, "CBD-A 0.4%", valid_cbd), None);
    }

    #[test]
    fn out_of_range_skipped_for_next_match() {
        let text = "THC: 60%\nTHC: 22.1%";
        assert_eq!(first_valid_percent(&THC_PERCENT, text, valid_thc), Some(22.1));
        assert_eq!(first_valid_percent(&THC_PERCENT, "THC: 60%", valid_thc), None);
    }

    #[test]
    fn cbd_and_total_patterns() {
        assert_eq!(first_valid_percent(&CBD_PERCENT, "CBD: 0.3%", valid_cbd), Some(0.3));
        assert_eq!(first_valid_percent(&CBD_PERCENT, "CBDA: 0.3%", valid_cbd), None);
        assert_eq!(
            first_valid_percent(&TOTAL_CANNABINOIDS_PERCENT, "TOTAL CANNABINOIDS: 26.1%", valid_total_cannabinoids),
            Some(26.1)
        );
    }

    #[test]
    fn ocr_garbled_percent() {
        assert_eq!(first_valid_percent(&THC_PERCENT, "THC: 2O.5%", valid_thc), Some(20.5));
    }

    #[test]
    fn test_date_labels() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(first_test_date("Date Tested: 03/15/2024"), Some(expected));
        assert_eq!(first_test_date("Completed: Mar 15, 2024"), Some(expected));
        assert_eq!(first_test_date("Tested on 15-Mar-2024"), Some(expected));
        assert_eq!(first_test_date("Reported: O3/l5/2O24"), Some(expected));
        assert_eq!(first_test_date("03/15/2024 with no label"), None);
    }

    #[test]
    fn char_window_respects_boundaries() {
        let text = "aβc";
        assert_eq!(char_window(text, 0, 2), "aβ");
        assert_eq!(char_window(text, 2, 10), "βc");
        assert_eq!(char_window(text, 50, 60), "");
    }
}
