//! Lab-format detection.
//!
//! Fixed priority order, first match wins, no scoring. Absence of every
//! pattern yields `LabType::Generic`.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::LabType;

/// Lab name patterns in detection priority order.
static LAB_PATTERNS: LazyLock<Vec<(LabType, Regex)>> = LazyLock::new(|| {
    vec![
        (
            LabType::TwoRiver,
            Regex::new(r"(?i)\b2\s*river(?:\s*lab(?:s|oratories)?)?\b|2riverlabs\.com").unwrap(),
        ),
        (
            LabType::ScLabs,
            Regex::new(r"(?i)\bsc\s*labs\b|sclabs\.com|\bsc\s+laboratories\b").unwrap(),
        ),
        (
            LabType::SteepHill,
            Regex::new(r"(?i)\bsteep\s*hill\b").unwrap(),
        ),
    ]
});

/// Detect which lab produced the COA.
pub fn detect_lab_type(text: &str) -> LabType {
    LAB_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map_or(LabType::Generic, |(lab, _)| *lab)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_two_river() {
        assert_eq!(detect_lab_type("2 River Labs, Inc\nCERTIFICATE OF ANALYSIS"), LabType::TwoRiver);
        assert_eq!(detect_lab_type("report by 2RIVER LABS"), LabType::TwoRiver);
        assert_eq!(detect_lab_type("www.2riverlabs.com"), LabType::TwoRiver);
    }

    #[test]
    fn detects_sc_labs() {
        assert_eq!(detect_lab_type("SC Labs | Santa Cruz"), LabType::ScLabs);
        assert_eq!(detect_lab_type("visit sclabs.com"), LabType::ScLabs);
    }

    #[test]
    fn detects_steep_hill() {
        assert_eq!(detect_lab_type("Steep Hill Labs"), LabType::SteepHill);
        assert_eq!(detect_lab_type("STEEPHILL"), LabType::SteepHill);
    }

    #[test]
    fn first_match_wins_in_priority_order() {
        let text = "Steep Hill reference sample, re-tested by 2 River Labs";
        assert_eq!(detect_lab_type(text), LabType::TwoRiver);
    }

    #[test]
    fn unknown_lab_is_generic() {
        assert_eq!(detect_lab_type("Acme Analytical\nTHC 20%"), LabType::Generic);
        assert_eq!(detect_lab_type(""), LabType::Generic);
    }

    #[test]
    fn word_boundaries_respected() {
        // "disc labs" must not read as SC Labs
        assert_eq!(detect_lab_type("disc labs"), LabType::Generic);
        assert_eq!(detect_lab_type("12 rivers"), LabType::Generic);
    }
}
