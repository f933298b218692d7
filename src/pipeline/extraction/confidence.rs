//! Confidence scales and the rubric shared by the combiner.
//!
//! Two integer scales exist: the merged record confidence ([5, 95]) and the
//! raw OCR-provider confidence ([10, 99]). Strategies score on the record
//! scale but are only capped at the top.

use crate::models::{PartialRecord, QualityLevel};

/// Confidence thresholds used by the pipeline and callers
pub mod thresholds {
    /// Floor of a merged record's confidence.
    pub const RECORD_MIN: u32 = 5;

    /// Ceiling of any extraction confidence.
    pub const RECORD_MAX: u32 = 95;

    /// Confidence of the record returned when extraction fails outright.
    pub const FALLBACK: u32 = 10;

    /// A strategy at or above this with THC and total present ends the run.
    pub const EARLY_EXIT: u32 = 85;

    /// Raw OCR-provider confidence bounds.
    pub const OCR_MIN: u32 = 10;
    pub const OCR_MAX: u32 = 99;

    /// Subtracted from the merged confidence when text quality is poor.
    pub const POOR_QUALITY_PENALTY: u32 = 10;
}

/// Additive rubric points.
pub mod rubric {
    pub const BATCH_ID: u32 = 5;
    pub const STRAIN_NAME: u32 = 5;
    pub const THC: u32 = 20;
    pub const CBD: u32 = 15;
    pub const TOTAL_CANNABINOIDS: u32 = 15;
    pub const TEST_DATE: u32 = 10;
    pub const TERPENES: u32 = 10;
    pub const CONSISTENCY: u32 = 8;
    /// Not a field weight; see `rubric_score`.
    pub const RECOGNIZED_LAB: u32 = 5;

    /// THC and total within this many points of each other are consistent.
    pub const CONSISTENCY_TOLERANCE: f64 = 2.0;
}

/// Strategy scores are capped at the record ceiling.
pub fn clamp_strategy_confidence(score: u32) -> u32 {
    score.min(thresholds::RECORD_MAX)
}

pub fn clamp_record_confidence(score: u32) -> u32 {
    score.clamp(thresholds::RECORD_MIN, thresholds::RECORD_MAX)
}

pub fn clamp_ocr_confidence(score: u32) -> u32 {
    score.clamp(thresholds::OCR_MIN, thresholds::OCR_MAX)
}

/// Score a merged record from the fields it carries. The result is clamped.
///
/// `rubric::RECOGNIZED_LAB` is not a field weight. It is a separate +5 for
/// records from a recognized lab format, added after the field rubric.
pub fn rubric_score(merged: &PartialRecord, recognized_lab: bool) -> u32 {
    let mut score = 0;
    if merged.batch_id.is_some() {
        score += rubric::BATCH_ID;
    }
    if merged.strain_name.is_some() {
        score += rubric::STRAIN_NAME;
    }
    if merged.thc_percentage.is_some() {
        score += rubric::THC;
    }
    if merged.cbd_percentage.is_some() {
        score += rubric::CBD;
    }
    if merged.total_cannabinoids.is_some() {
        score += rubric::TOTAL_CANNABINOIDS;
    }
    if merged.test_date.is_some() {
        score += rubric::TEST_DATE;
    }
    if merged.terpenes.as_ref().is_some_and(|t| !t.is_empty()) {
        score += rubric::TERPENES;
    }
    if thc_total_consistent(merged.thc_percentage, merged.total_cannabinoids) {
        score += rubric::CONSISTENCY;
    }
    if recognized_lab {
        score += rubric::RECOGNIZED_LAB;
    }
    clamp_record_confidence(score)
}

/// THC and total cannabinoids both present and within tolerance.
pub fn thc_total_consistent(thc: Option<f64>, total: Option<f64>) -> bool {
    match (thc, total) {
        (Some(thc), Some(total)) => (thc - total).abs() <= rubric::CONSISTENCY_TOLERANCE,
        _ => false,
    }
}

/// Apply the text-quality bias to a merged confidence.
pub fn apply_quality_bias(confidence: u32, quality: QualityLevel) -> u32 {
    match quality {
        QualityLevel::Poor => {
            clamp_record_confidence(confidence.saturating_sub(thresholds::POOR_QUALITY_PENALTY))
        }
        _ => clamp_record_confidence(confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionMethod, Terpene};

    fn merged() -> PartialRecord {
        PartialRecord::new(ExtractionMethod::CombinedStrategies, 0)
    }

    #[test]
    fn empty_record_scores_floor() {
        assert_eq!(rubric_score(&merged(), false), thresholds::RECORD_MIN);
    }

    #[test]
    fn full_record_capped() {
        let mut record = merged();
        record.batch_id = Some("EVM1234567".into());
        record.strain_name = Some("Cereal Milk".into());
        record.thc_percentage = Some(24.5);
        record.cbd_percentage = Some(0.3);
        record.total_cannabinoids = Some(26.1);
        record.terpenes = Some(vec![Terpene {
            name: "Myrcene".into(),
            percentage: 0.51,
        }]);
        // 5+5+20+15+15+10+8 = 78, without a date
        assert_eq!(rubric_score(&record, false), 78);
        assert_eq!(rubric_score(&record, true), 83);
    }

    #[test]
    fn recognized_lab_bonus_is_separate_from_field_weights() {
        let mut record = merged();
        record.thc_percentage = Some(22.0);
        record.total_cannabinoids = Some(24.0);
        let fields = rubric::THC + rubric::TOTAL_CANNABINOIDS + rubric::CONSISTENCY;
        assert_eq!(rubric_score(&record, false), fields);
        assert_eq!(rubric_score(&record, true), fields + rubric::RECOGNIZED_LAB);
    }

    #[test]
    fn empty_terpene_list_earns_nothing() {
        let mut record = merged();
        record.thc_percentage = Some(20.0);
        record.terpenes = Some(vec![]);
        assert_eq!(rubric_score(&record, false), 20);
    }

    #[test]
    fn consistency_tolerance_is_inclusive() {
        assert!(thc_total_consistent(Some(24.0), Some(26.0)));
        assert!(thc_total_consistent(Some(26.0), Some(24.5)));
        assert!(!thc_total_consistent(Some(20.0), Some(26.0)));
        assert!(!thc_total_consistent(Some(20.0), None));
    }

    #[test]
    fn poor_quality_penalty_respects_floor() {
        assert_eq!(apply_quality_bias(50, QualityLevel::Poor), 40);
        assert_eq!(apply_quality_bias(8, QualityLevel::Poor), thresholds::RECORD_MIN);
        assert_eq!(apply_quality_bias(50, QualityLevel::Fair), 50);
    }

    #[test]
    fn clamps() {
        assert_eq!(clamp_strategy_confidence(120), 95);
        assert_eq!(clamp_strategy_confidence(20), 20);
        assert_eq!(clamp_record_confidence(0), 5);
        assert_eq!(clamp_ocr_confidence(0), 10);
        assert_eq!(clamp_ocr_confidence(100), 99);
    }
}
