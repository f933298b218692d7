use serde::{Deserialize, Serialize};

use super::confidence::clamp_ocr_confidence;
use super::ExtractionError;

/// Output of an upstream OCR provider, as handed to the extraction core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOutput {
    pub success: bool,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OcrMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrMetadata {
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub has_tables: bool,
}

impl OcrOutput {
    /// True when the provider succeeded and produced non-blank text.
    pub fn is_usable(&self) -> bool {
        self.success && !self.extracted_text.trim().is_empty()
    }

    /// Provider confidence on the integer OCR scale [10, 99].
    ///
    /// Providers report either a fraction (0..=1) or a percentage (0..=100).
    pub fn normalized_confidence(&self) -> Option<u32> {
        let raw = self.confidence.filter(|c| c.is_finite())?;
        let percent = if raw <= 1.0 { raw * 100.0 } else { raw };
        Some(clamp_ocr_confidence(percent.round().max(0.0) as u32))
    }
}

/// Encode any report or record as JSON for output.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, ExtractionError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
