//! Result combiner: first-writer-wins merge over partials ordered by their
//! own confidence, rubric rescoring, then lab defaults.

use tracing::debug;

use super::confidence::rubric_score;
use crate::models::{ExtractedRecord, ExtractionMethod, LabType, PartialRecord};

/// Merge partial records into the final record.
///
/// Partials are sorted by confidence, descending; ties keep execution order.
/// A field set by an earlier partial is never overwritten.
pub fn combine(mut partials: Vec<PartialRecord>, lab: LabType) -> ExtractedRecord {
    partials.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let merged = partials
        .into_iter()
        .fold(PartialRecord::default(), merge_absent);

    let confidence = rubric_score(&merged, lab != LabType::Generic);
    let defaults = lab.defaults();

    debug!(
        lab = %lab,
        confidence,
        fields = merged.filled_fields(),
        "Partials combined"
    );

    ExtractedRecord {
        batch_id: merged.batch_id,
        strain_name: merged.strain_name,
        category: merged
            .category
            .or_else(|| defaults.map(|d| d.category.to_string())),
        sub_category: merged
            .sub_category
            .or_else(|| defaults.and_then(|d| d.sub_category).map(str::to_string)),
        thc_percentage: merged.thc_percentage,
        cbd_percentage: merged.cbd_percentage,
        total_cannabinoids: merged.total_cannabinoids,
        lab_name: merged
            .lab_name
            .or_else(|| defaults.map(|d| d.lab_name.to_string())),
        test_date: merged.test_date,
        terpenes: merged.terpenes.unwrap_or_default(),
        confidence,
        extraction_method: ExtractionMethod::CombinedStrategies,
    }
}

/// Fill every field of `acc` that is still absent from `next`.
fn merge_absent(acc: PartialRecord, next: PartialRecord) -> PartialRecord {
    PartialRecord {
        batch_id: acc.batch_id.or(next.batch_id),
        strain_name: acc.strain_name.or(next.strain_name),
        category: acc.category.or(next.category),
        sub_category: acc.sub_category.or(next.sub_category),
        thc_percentage: acc.thc_percentage.or(next.thc_percentage),
        cbd_percentage: acc.cbd_percentage.or(next.cbd_percentage),
        total_cannabinoids: acc.total_cannabinoids.or(next.total_cannabinoids),
        lab_name: acc.lab_name.or(next.lab_name),
        test_date: acc.test_date.or(next.test_date),
        terpenes: acc
            .terpenes
            .filter(|t| !t.is_empty())
            .or(next.terpenes.filter(|t| !t.is_empty())),
        confidence: acc.confidence,
        extraction_method: acc.extraction_method.or(next.extraction_method),
    }
}
