//! OCR/text quality validator.
//!
//! Starts at 100 and subtracts fixed penalties. The resulting report is
//! advisory: the orchestrator logs a failed gate and biases confidence, it
//! never aborts extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::lab_detect::detect_lab_type;
use super::sanitize::non_standard_char_ratio;
use super::table_detect::has_tabular_structure;
use crate::models::{LabType, QualityLevel};

const SHORT_TEXT_CHARS: usize = 500;
const BRIEF_TEXT_CHARS: usize = 1000;
const ODD_CHAR_RATIO_LIMIT: f64 = 0.1;

const SHORT_TEXT_PENALTY: u32 = 30;
const BRIEF_TEXT_PENALTY: u32 = 15;
const REPLACEMENT_CHAR_PENALTY: u32 = 20;
const ODD_CHAR_PENALTY: u32 = 15;
const NO_HEADER_PENALTY: u32 = 10;
const NO_PERCENT_PENALTY: u32 = 20;
const NO_LAB_PENALTY: u32 = 10;
const NO_TERPENE_PENALTY: u32 = 5;
const NO_TABLE_PENALTY: u32 = 5;

const EXCELLENT_MIN: u32 = 85;
const GOOD_MIN: u32 = 70;
const FAIR_MIN: u32 = 50;

static CERTIFICATE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)certificate\s+of\s+analysis|\bC\.?O\.?A\.?\b").unwrap()
});

/// A capitalized name followed by `Labs` or `Laboratories`, as in
/// "Acme Analytical Laboratories". Bare "lab" or "testing" is boilerplate.
static LAB_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b[A-Z0-9][A-Za-z0-9&'.\-]*,?\s+(?:Labs?|LABS?|Laborator(?:y|ies)|LABORATOR(?:Y|IES))\b",
    )
    .unwrap()
});

static PERCENT_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d\s*%").unwrap());

static TERPENE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)terpene|myrcene|limonene|caryophyllene|pinene|linalool|humulene|terpinolene")
        .unwrap()
});

/// COA-specific signals found in the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoaIndicators {
    pub has_certificate_header: bool,
    pub has_lab_name: bool,
    pub has_percentages: bool,
    pub has_terpenes: bool,
    pub has_tabular_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub quality: QualityLevel,
    pub confidence: u32,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub coa_indicators: CoaIndicators,
}

impl QualityReport {
    /// Advisory gate: a recognisable COA with at least one percentage.
    pub fn should_proceed(&self) -> bool {
        let ind = &self.coa_indicators;
        (ind.has_certificate_header || ind.has_lab_name) && ind.has_percentages
    }
}

/// Score text quality and collect COA indicators. Expects the raw OCR text so
/// replacement characters are still visible.
pub fn validate_ocr_quality(text: &str) -> QualityReport {
    let mut score: u32 = 100;
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    let mut penalize = |points: u32, issue: &str, recommendation: &str| {
        score = score.saturating_sub(points);
        issues.push(issue.to_string());
        recommendations.push(recommendation.to_string());
    };

    let chars = text.chars().count();
    if chars < SHORT_TEXT_CHARS {
        penalize(
            SHORT_TEXT_PENALTY,
            "Text is very short",
            "Check that every page of the document was processed",
        );
    } else if chars < BRIEF_TEXT_CHARS {
        penalize(
            BRIEF_TEXT_PENALTY,
            "Text is shorter than a typical COA",
            "Verify the OCR captured the full report",
        );
    }

    if text.contains('\u{FFFD}') {
        penalize(
            REPLACEMENT_CHAR_PENALTY,
            "Text contains unreadable characters",
            "Re-run OCR with a higher resolution scan",
        );
    }

    if non_standard_char_ratio(text) > ODD_CHAR_RATIO_LIMIT {
        penalize(
            ODD_CHAR_PENALTY,
            "High ratio of non-standard characters",
            "Check the OCR language settings",
        );
    }

    let indicators = CoaIndicators {
        has_certificate_header: CERTIFICATE_HEADER.is_match(text),
        has_lab_name: detect_lab_type(text) != LabType::Generic || LAB_NAME.is_match(text),
        has_percentages: PERCENT_VALUE.is_match(text),
        has_terpenes: TERPENE_KEYWORD.is_match(text),
        has_tabular_data: has_tabular_structure(text),
    };

    if !indicators.has_certificate_header {
        penalize(
            NO_HEADER_PENALTY,
            "No certificate of analysis header found",
            "Confirm the document is a certificate of analysis",
        );
    }
    if !indicators.has_percentages {
        penalize(
            NO_PERCENT_PENALTY,
            "No percentage values found",
            "Review the potency section manually",
        );
    }
    if !indicators.has_lab_name {
        penalize(
            NO_LAB_PENALTY,
            "No laboratory name found",
            "Enter the testing lab manually",
        );
    }
    if !indicators.has_terpenes {
        penalize(
            NO_TERPENE_PENALTY,
            "No terpene data found",
            "Check whether the report includes a terpene panel",
        );
    }
    if !indicators.has_tabular_data {
        penalize(
            NO_TABLE_PENALTY,
            "No tabular structure detected",
            "Use an OCR mode that preserves table layout",
        );
    }

    let confidence = score.min(100);
    QualityReport {
        quality: quality_band(confidence),
        confidence,
        issues,
        recommendations,
        coa_indicators: indicators,
    }
}

/// Convenience wrapper for the advisory gate.
pub fn should_proceed(report: &QualityReport) -> bool {
    report.should_proceed()
}

fn quality_band(score: u32) -> QualityLevel {
    if score >= EXCELLENT_MIN {
        QualityLevel::Excellent
    } else if score >= GOOD_MIN {
        QualityLevel::Good
    } else if score >= FAIR_MIN {
        QualityLevel::Fair
    } else {
        QualityLevel::Poor
    }
}
