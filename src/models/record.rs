use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ExtractionMethod, LabType};

/// A single terpene measurement, already converted to percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terpene {
    pub name: String,
    pub percentage: f64,
}

/// Final structured record handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thc_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cbd_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cannabinoids: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub terpenes: Vec<Terpene>,
    pub confidence: u32,
    pub extraction_method: ExtractionMethod,
}

impl ExtractedRecord {
    /// Minimal record returned when the pipeline itself fails.
    pub fn fallback(lab: LabType) -> Self {
        Self {
            batch_id: None,
            strain_name: None,
            category: None,
            sub_category: None,
            thc_percentage: None,
            cbd_percentage: None,
            total_cannabinoids: None,
            lab_name: Some(lab.fallback_lab_name().to_string()),
            test_date: None,
            terpenes: Vec::new(),
            confidence: 10,
            extraction_method: ExtractionMethod::Fallback,
        }
    }

    /// Terpene list encoded for a single text column.
    pub fn terpenes_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.terpenes)
    }
}

/// Output of one strategy run. Every field may be absent; only merged, never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub batch_id: Option<String>,
    pub strain_name: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub thc_percentage: Option<f64>,
    pub cbd_percentage: Option<f64>,
    pub total_cannabinoids: Option<f64>,
    pub lab_name: Option<String>,
    pub test_date: Option<DateTime<Utc>>,
    pub terpenes: Option<Vec<Terpene>>,
    pub confidence: u32,
    pub extraction_method: Option<ExtractionMethod>,
}

impl PartialRecord {
    pub fn new(method: ExtractionMethod, confidence: u32) -> Self {
        Self {
            confidence,
            extraction_method: Some(method),
            ..Self::default()
        }
    }

    /// Early-exit condition: both headline potency values found.
    pub fn has_thc_and_total(&self) -> bool {
        self.thc_percentage.is_some() && self.total_cannabinoids.is_some()
    }

    /// Number of data fields populated (confidence and method tag excluded).
    pub fn filled_fields(&self) -> usize {
        [
            self.batch_id.is_some(),
            self.strain_name.is_some(),
            self.category.is_some(),
            self.sub_category.is_some(),
            self.thc_percentage.is_some(),
            self.cbd_percentage.is_some(),
            self.total_cannabinoids.is_some(),
            self.lab_name.is_some(),
            self.test_date.is_some(),
            self.terpenes.as_ref().is_some_and(|t| !t.is_empty()),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}
