//! Whole-document scenarios through the public entry points.

use chrono::{TimeZone, Utc};

use super::confidence::thresholds;
use super::{detect_lab_type, extract, extract_terpenes, validate_ocr_quality};
use crate::models::{ExtractionMethod, LabType, QualityLevel, Terpene};

const TWO_RIVER_COA: &str = "\
2 River Labs, Inc
CERTIFICATE OF ANALYSIS
EVM1234567
SAMPLE: CEREAL MILK (FLOWER
THC: 24.5%
CBD: 0.3%
TOTAL CANNABINOIDS: 26.1%
TERPENES BY GC-MS
| Analyte | Amount |
| MYRCENE | 5.1 mg/g |";

const SC_LABS_COA: &str = "\
## **SC Labs**
Certificate of Analysis
Sample Name: Blue Dream (Flower)
Batch ID: BD-2024-07
Date Tested: Mar 15, 2024
POTENCY SUMMARY
Total THC 21.3%
Total CBD <LOQ
Total Cannabinoids 23.0%
Page 1 of 2
TERPENE PROFILE
| Analyte | Result (mg/g) |
|---------|---------------|
| β-Myrcene | 6.2 |
| d-Limonene | 3.4 |
| beta-Caryophyllene | 2.9 |
| Linalool | ND |
| Myrcene | 4.0 |
Page 2 of 2";

/// Unrecognized lab: every fallback strategy runs.
const GENERIC_HEADER: &str = "Acme Analytical Laboratories\nCertificate of Analysis\n";

fn generic(body: &str) -> String {
    format!("{GENERIC_HEADER}{body}")
}

#[test]
fn two_river_round_trip() {
    let record = extract(TWO_RIVER_COA);
    assert_eq!(record.batch_id.as_deref(), Some("EVM1234567"));
    assert_eq!(record.strain_name.as_deref(), Some("CEREAL MILK"));
    assert_eq!(record.category.as_deref(), Some("Flower"));
    assert_eq!(record.sub_category.as_deref(), Some("Inhalable"));
    assert_eq!(record.thc_percentage, Some(24.5));
    assert_eq!(record.cbd_percentage, Some(0.3));
    assert_eq!(record.total_cannabinoids, Some(26.1));
    assert_eq!(record.lab_name.as_deref(), Some("2 River Labs, Inc"));
    assert_eq!(
        record.terpenes,
        vec![Terpene {
            name: "Myrcene".into(),
            percentage: 0.51
        }]
    );
    assert!(record.confidence >= 80, "confidence {}", record.confidence);
    assert_eq!(record.extraction_method, ExtractionMethod::CombinedStrategies);
}

#[test]
fn plain_text_terpene_row() {
    let text = TWO_RIVER_COA.replace(
        "| Analyte | Amount |\n| MYRCENE | 5.1 mg/g |",
        "MYRCENE ... 5.1 mg/g",
    );
    let record = extract(&text);
    assert_eq!(record.terpenes.len(), 1);
    assert_eq!(record.terpenes[0].name, "Myrcene");
    assert_eq!(record.terpenes[0].percentage, 0.51);
}

#[test]
fn sc_labs_document() {
    assert_eq!(detect_lab_type(SC_LABS_COA), LabType::ScLabs);
    let record = extract(SC_LABS_COA);
    assert_eq!(record.strain_name.as_deref(), Some("Blue Dream"));
    assert_eq!(record.batch_id.as_deref(), Some("BD-2024-07"));
    assert_eq!(record.thc_percentage, Some(21.3));
    assert!(record.cbd_percentage.is_none(), "<LOQ is absent, not zero");
    assert_eq!(record.total_cannabinoids, Some(23.0));
    assert_eq!(
        record.test_date,
        Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap())
    );
    assert_eq!(record.lab_name.as_deref(), Some("SC Labs"));
    assert!(record.sub_category.is_none());

    // Myrcene appears twice; the larger value is kept. ND rows are dropped.
    let names: Vec<&str> = record.terpenes.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Myrcene", "Limonene", "Caryophyllene"]);
    assert_eq!(record.terpenes[0].percentage, 0.62);
}

#[test]
fn standalone_terpene_panel_uses_wider_limit() {
    let text = "TERPENE PROFILE\n| Analyte | % |\n| Myrcene | 0.9 |\n| Limonene | 0.8 |\n\
                | Linalool | 0.7 |\n| Humulene | 0.6 |\n| Ocimene | 0.5 |\n| Terpinolene | 0.4 |";
    let terpenes = extract_terpenes(text);
    assert_eq!(terpenes.len(), 5);
    assert!(terpenes.windows(2).all(|w| w[0].percentage >= w[1].percentage));
}

#[test]
fn boilerplate_only_scores_near_floor() {
    let text = "This report is provided for informational purposes only.\n\
                Results relate only to the items received.";
    let record = extract(text);
    assert!(record.thc_percentage.is_none());
    assert!(record.cbd_percentage.is_none());
    assert!(record.total_cannabinoids.is_none());
    assert!(record.confidence <= 30, "confidence {}", record.confidence);
    assert_eq!(validate_ocr_quality(text).quality, QualityLevel::Poor);
}

#[test]
fn generic_cbd_not_detected_stays_absent() {
    for body in [
        "THC: 22.0%\nCBD: ND",
        "THC: 22.0%\nCBD: ND\nTotal Cannabinoids: 24.0%",
        "Total Cannabinoids: 24.0%\nCBD <LOQ\nTHC: 22.0%",
    ] {
        let text = generic(body);
        assert_eq!(detect_lab_type(&text), LabType::Generic);
        let record = extract(&text);
        assert!(record.cbd_percentage.is_none(), "{body:?} -> {:?}", record.cbd_percentage);
        assert_eq!(record.thc_percentage, Some(22.0), "{body:?}");
    }
}

#[test]
fn generic_terpene_percent_table_is_not_cbd() {
    let text = generic(
        "THC: 22.0%\nTotal Cannabinoids: 24.0%\nTERPENE PROFILE\n\
         | Analyte | Result (%) |\n| Myrcene | 0.85 |\n| Limonene | 0.42 % |",
    );
    let record = extract(&text);
    assert!(record.cbd_percentage.is_none());
    assert_eq!(record.thc_percentage, Some(22.0));
    assert_eq!(record.total_cannabinoids, Some(24.0));
    let names: Vec<&str> = record.terpenes.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Myrcene", "Limonene"]);
}

#[test]
fn generic_non_potency_decimals_are_not_cbd() {
    let text = generic(
        "Report template revision 2.1\nIssued 03.15.2024\nSample mass 1.25 g\n\
         THC: 22.0%\nTotal Cannabinoids: 24.0%",
    );
    let record = extract(&text);
    assert!(record.cbd_percentage.is_none());
    assert_eq!(record.thc_percentage, Some(22.0));
    assert_eq!(record.total_cannabinoids, Some(24.0));

    let record = extract("Report template revision 2.1. Results relate only to the items received.");
    assert!(record.cbd_percentage.is_none());
    assert!(record.thc_percentage.is_none());
}

#[test]
fn generic_acid_form_is_not_thc() {
    let record = extract(&generic("THC-A: 26.0%\nCBD: 0.4%"));
    assert!(record.thc_percentage.is_none());
    assert_eq!(record.cbd_percentage, Some(0.4));
}

#[test]
fn implausible_thc_is_never_stored() {
    let record = extract("THC: 60%");
    assert!(record.thc_percentage.is_none());
}

#[test]
fn consistency_bonus_end_to_end() {
    let consistent = extract("THC: 24.0%\nTotal Cannabinoids: 25.5%");
    let inconsistent = extract("THC: 20.0%\nTotal Cannabinoids: 25.5%");
    assert_eq!(consistent.confidence, inconsistent.confidence + 8);
}

#[test]
fn labelled_value_beats_bare_number() {
    let record = extract("Moisture 18.50\nTHC: 22.4%");
    assert_eq!(record.thc_percentage, Some(22.4));
}

#[test]
fn ocr_confusions_repaired() {
    let record = extract("Certificate of Analysis\nTHC: 2O.5%\nTested on 15-Mar-2O24");
    assert_eq!(record.thc_percentage, Some(20.5));
    assert_eq!(
        record.test_date,
        Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap())
    );
}

#[test]
fn confidence_always_bounded() {
    let inputs = [
        "",
        "\u{FFFD}\u{FFFD}",
        "THC",
        "99.9% 88.8% 77.7%",
        TWO_RIVER_COA,
        SC_LABS_COA,
    ];
    for text in inputs {
        let record = extract(text);
        assert!(
            (thresholds::RECORD_MIN..=thresholds::RECORD_MAX).contains(&record.confidence),
            "{text:?} -> {}",
            record.confidence
        );
    }
}
