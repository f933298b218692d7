use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, info, info_span, warn};

use super::combiner::combine;
use super::confidence::apply_quality_bias;
use super::lab_detect::detect_lab_type;
use super::quality::validate_ocr_quality;
use super::sanitize::clean_ocr_text;
use super::strategies::plan_strategies;
use super::terpenes::terpene_partial;
use super::types::OcrOutput;
use super::ExtractionError;
use crate::config::ExtractionConfig;
use crate::models::{ExtractedRecord, LabType, PartialRecord};

/// Runs the full pipeline: cleanup, lab detection, quality scoring,
/// strategies with early exit, terpene panel, combine.
#[derive(Debug, Clone, Default)]
pub struct CoaExtractor {
    config: ExtractionConfig,
}

impl CoaExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Fallible extraction. Rejects empty and oversized input.
    pub fn try_extract(&self, text: &str) -> Result<ExtractedRecord, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        if text.len() > self.config.max_text_bytes {
            return Err(ExtractionError::TextTooLarge {
                len: text.len(),
                max: self.config.max_text_bytes,
            });
        }

        let cleaned = clean_ocr_text(text);
        let lab = detect_lab_type(&cleaned);
        let span = info_span!("extract_coa", chars = text.len(), lab = %lab);
        let _enter = span.enter();

        // Scored on the raw text so replacement characters still count
        let report = validate_ocr_quality(text);
        if !report.should_proceed() {
            warn!(
                quality = %report.quality,
                issues = ?report.issues,
                "Text does not look like a complete COA, extracting anyway"
            );
        }

        let mut partials = self.run_strategies(&cleaned, lab);
        if let Some(terpenes) = terpene_partial(&cleaned, self.config.terpene_limit) {
            partials.push(terpenes);
        }

        let mut record = combine(partials, lab);
        record.confidence = apply_quality_bias(record.confidence, report.quality);

        info!(
            confidence = record.confidence,
            quality = %report.quality,
            terpenes = record.terpenes.len(),
            "COA extraction complete"
        );
        Ok(record)
    }

    /// Non-failing extraction. Any error or panic yields the fallback record.
    pub fn extract(&self, text: &str) -> ExtractedRecord {
        recover(text, || self.try_extract(text))
    }

    /// Caller-side entry for OCR provider output. A failed provider or blank
    /// text is rejected before the core runs.
    pub fn extract_from_ocr(&self, output: &OcrOutput) -> Result<ExtractedRecord, ExtractionError> {
        if !output.success {
            return Err(ExtractionError::OcrFailed {
                provider: output.provider.clone(),
            });
        }
        if !output.is_usable() {
            return Err(ExtractionError::EmptyText);
        }
        debug!(
            provider = %output.provider,
            ocr_confidence = ?output.normalized_confidence(),
            "Extracting from OCR output"
        );
        Ok(self.extract(&output.extracted_text))
    }

    /// Execute the strategy plan in priority order, stopping after the first
    /// strategy that is confident and has both THC and total cannabinoids.
    fn run_strategies(&self, text: &str, lab: LabType) -> Vec<PartialRecord> {
        let plan = plan_strategies(lab, &self.config);
        let mut partials = Vec::with_capacity(plan.len() + 1);
        for strategy in &plan {
            let partial = strategy.extract(text);
            let method = partial.extraction_method.map_or("unknown", |m| m.as_str());
            debug!(
                strategy = method,
                confidence = partial.confidence,
                fields = partial.filled_fields(),
                "Strategy result"
            );
            let done = partial.confidence >= self.config.early_exit_confidence
                && partial.has_thc_and_total();
            partials.push(partial);
            if done {
                info!(strategy = method, "Early exit, remaining strategies skipped");
                break;
            }
        }
        partials
    }
}

/// Convert an error or panic inside `run` into the fallback record.
fn recover<F>(text: &str, run: F) -> ExtractedRecord
where
    F: FnOnce() -> Result<ExtractedRecord, ExtractionError>,
{
    match catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(record)) => record,
        Ok(Err(e)) => {
            warn!(error = %e, "Extraction failed, returning fallback record");
            ExtractedRecord::fallback(detect_lab_type(text))
        }
        Err(_) => {
            error!("Extraction panicked, returning fallback record");
            ExtractedRecord::fallback(detect_lab_type(text))
        }
    }
}

/// Extract a record with the default configuration. Never fails.
pub fn extract(text: &str) -> ExtractedRecord {
    CoaExtractor::default().extract(text)
}

/// Extract with the default configuration, surfacing input errors.
pub fn try_extract(text: &str) -> Result<ExtractedRecord, ExtractionError> {
    CoaExtractor::default().try_extract(text)
}

/// Caller-side entry for OCR provider output, default configuration.
pub fn extract_from_ocr(output: &OcrOutput) -> Result<ExtractedRecord, ExtractionError> {
    CoaExtractor::default().extract_from_ocr(output)
}
