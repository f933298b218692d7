use serde::Deserialize;

use crate::pipeline::extraction::confidence::thresholds;
use crate::pipeline::extraction::strategies::contextual::DEFAULT_PROXIMITY_WINDOW;
use crate::pipeline::extraction::terpenes::DEFAULT_TERPENE_LIMIT;

/// Application-level constants
pub const APP_NAME: &str = "COA Extract";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest input accepted by the extractor (5 MiB).
pub const MAX_TEXT_BYTES: usize = 5 * 1024 * 1024;

/// Terpenes folded into a lab-specific strategy result.
pub const LAB_TERPENE_LIMIT: usize = 3;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "coa_extract=info,warn"
}

/// Tunables for one extractor instance. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// A strategy at or above this confidence with THC and total ends the run.
    pub early_exit_confidence: u32,
    /// Terpenes kept by the standalone panel pass.
    pub terpene_limit: usize,
    /// Terpenes kept by lab-specific strategies.
    pub lab_terpene_limit: usize,
    /// Inputs longer than this are rejected.
    pub max_text_bytes: usize,
    /// Bytes inspected on each side of a keyword by the contextual strategy.
    pub proximity_window: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            early_exit_confidence: thresholds::EARLY_EXIT,
            terpene_limit: DEFAULT_TERPENE_LIMIT,
            lab_terpene_limit: LAB_TERPENE_LIMIT,
            max_text_bytes: MAX_TEXT_BYTES,
            proximity_window: DEFAULT_PROXIMITY_WINDOW,
        }
    }
}

impl ExtractionConfig {
    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
