//! Certificate-of-Analysis text extraction.
//!
//! Turns noisy OCR text of a cannabis lab report into an [`ExtractedRecord`]
//! with a bounded confidence score.

pub mod config;
pub mod models;
pub mod pipeline;

pub use models::{ExtractedRecord, ExtractionMethod, LabType, QualityLevel, Terpene};
pub use pipeline::extraction::{
    detect_lab_type, extract, extract_from_ocr, extract_terpenes, try_extract,
    validate_ocr_quality, CoaExtractor, ExtractionError, OcrOutput, QualityReport,
};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber, logging to stderr.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{} logging initialised", config::APP_NAME, config::APP_VERSION);
}
