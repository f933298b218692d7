//! COA text extraction core.

pub mod combiner;
pub mod confidence;
pub mod lab_detect;
pub mod normalize;
pub mod orchestrator;
pub mod quality;
pub mod sanitize;
pub mod strategies;
pub mod table_detect;
pub mod terpene_names;
pub mod terpenes;
pub mod types;

#[cfg(test)]
mod scenario_tests;

pub use combiner::combine;
pub use lab_detect::detect_lab_type;
pub use orchestrator::*;
pub use quality::{should_proceed, validate_ocr_quality, CoaIndicators, QualityReport};
pub use sanitize::clean_ocr_text;
pub use terpenes::extract_terpenes;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("OCR text is empty")]
    EmptyText,

    #[error("OCR text too large: {len} bytes (limit {max})")]
    TextTooLarge { len: usize, max: usize },

    #[error("OCR provider {provider} returned no usable text")]
    OcrFailed { provider: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
