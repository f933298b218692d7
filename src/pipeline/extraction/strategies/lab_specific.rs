use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{
    char_window, first_test_date, first_valid_percent, ExtractionStrategy, CBD_PERCENT,
    THC_PERCENT, TOTAL_CANNABINOIDS_PERCENT,
};
use crate::models::{ExtractionMethod, LabType, PartialRecord};
use crate::pipeline::extraction::confidence::clamp_strategy_confidence;
use crate::pipeline::extraction::normalize::{
    repair_numeric_token, valid_cbd, valid_thc, valid_total_cannabinoids,
};
use crate::pipeline::extraction::terpenes::{
    extract_terpenes_with_limit, has_terpene_panel, TERPENE_CONFIDENCE_BOOST,
};

const BASE_CONFIDENCE: u32 = 40;
const BATCH_BONUS: u32 = 10;
const STRAIN_BONUS: u32 = 10;
const THC_BONUS: u32 = 15;
const CBD_BONUS: u32 = 10;
const TOTAL_BONUS: u32 = 15;
const DATE_BONUS: u32 = 5;

/// Characters searched after a lab's potency section header.
const POTENCY_SECTION_SPAN: usize = 2000;

/// Hand-tuned layout patterns for one lab.
struct LabProfile {
    /// Capture 1: batch identifier.
    batch: Regex,
    /// Capture 1: strain name. Optional capture 2: product category word.
    strain: Regex,
    /// Header opening the cannabinoid results section.
    potency_section: Regex,
    /// Batch ids in this layout carry OCR-prone digits after a fixed prefix.
    batch_prefix: Option<&'static str>,
}

const CATEGORY_WORDS: &str =
    r"flower|pre[\s\-]?roll|concentrate|vape|cartridge|edible|infused|bud|shake|trim|extract";

static TWO_RIVER: LazyLock<LabProfile> = LazyLock::new(|| LabProfile {
    batch: Regex::new(r"\bEVM\s?([0-9OolI]{7})\b").unwrap(),
    strain: Regex::new(&format!(
        r"(?i)\bSAMPLE\s*:\s*([a-z0-9][a-z0-9 '&.#\-]*?)\s*\(\s*({CATEGORY_WORDS})"
    ))
    .unwrap(),
    potency_section: Regex::new(r"(?i)\b(?:cannabinoid\s+(?:profile|potency|analysis)|potency)\b")
        .unwrap(),
    batch_prefix: Some("EVM"),
});

static SC_LABS: LazyLock<LabProfile> = LazyLock::new(|| LabProfile {
    batch: Regex::new(r"(?i)\bbatch\s*(?:id|#|no\.?|number)?\s*[:#]\s*([a-z0-9][a-z0-9\-]{3,})")
        .unwrap(),
    strain: Regex::new(&format!(
        r"(?im)\bsample\s+name\s*:\s*([^\n|(]+?)\s*(?:\(\s*({CATEGORY_WORDS})|$)"
    ))
    .unwrap(),
    potency_section: Regex::new(r"(?i)\bpotency\s+(?:summary|test\s+results?|analysis)\b").unwrap(),
    batch_prefix: None,
});

static STEEP_HILL: LazyLock<LabProfile> = LazyLock::new(|| LabProfile {
    batch: Regex::new(
        r"(?i)\b(?:lot|batch)\s*(?:#|no\.?|number|id)?\s*[:#]\s*([a-z0-9][a-z0-9\-]{3,})",
    )
    .unwrap(),
    strain: Regex::new(&format!(
        r"(?im)\b(?:strain|product\s+name|sample)\s*:\s*([^\n|(]+?)\s*(?:\(\s*({CATEGORY_WORDS})|$)"
    ))
    .unwrap(),
    potency_section: Regex::new(r"(?i)\bcannabinoid\s+(?:profile|analysis|potency)\b").unwrap(),
    batch_prefix: None,
});

/// Patterns tuned to one known lab's layout. Only planned for non-generic labs.
pub struct LabSpecificStrategy {
    lab: LabType,
    method: ExtractionMethod,
    terpene_limit: usize,
}

impl LabSpecificStrategy {
    pub fn for_lab(lab: LabType, terpene_limit: usize) -> Option<Self> {
        let method = lab.specific_method()?;
        Some(Self {
            lab,
            method,
            terpene_limit,
        })
    }

    fn profile(&self) -> &'static LabProfile {
        match self.lab {
            LabType::TwoRiver => &TWO_RIVER,
            LabType::ScLabs => &SC_LABS,
            // `for_lab` never builds a generic strategy
            LabType::SteepHill | LabType::Generic => &STEEP_HILL,
        }
    }
}

impl ExtractionStrategy for LabSpecificStrategy {
    fn extract(&self, text: &str) -> PartialRecord {
        let profile = self.profile();
        let mut partial = PartialRecord::new(self.method, 0);
        let mut confidence = BASE_CONFIDENCE;

        if let Some(batch) = find_batch(profile, text) {
            partial.batch_id = Some(batch);
            confidence += BATCH_BONUS;
        }

        if let Some((strain, category)) = find_strain(profile, text) {
            partial.strain_name = Some(strain);
            partial.category = category;
            confidence += STRAIN_BONUS;
        }

        let potency = potency_region(profile, text);
        if let Some(thc) = first_valid_percent(&THC_PERCENT, potency, valid_thc) {
            partial.thc_percentage = Some(thc);
            confidence += THC_BONUS;
        }
        if let Some(cbd) = first_valid_percent(&CBD_PERCENT, potency, valid_cbd) {
            partial.cbd_percentage = Some(cbd);
            confidence += CBD_BONUS;
        }
        if let Some(total) =
            first_valid_percent(&TOTAL_CANNABINOIDS_PERCENT, potency, valid_total_cannabinoids)
        {
            partial.total_cannabinoids = Some(total);
            confidence += TOTAL_BONUS;
        }

        if let Some(date) = first_test_date(text) {
            partial.test_date = Some(date);
            confidence += DATE_BONUS;
        }

        if has_terpene_panel(text) {
            let terpenes = extract_terpenes_with_limit(text, self.terpene_limit);
            if !terpenes.is_empty() {
                partial.terpenes = Some(terpenes);
                confidence += TERPENE_CONFIDENCE_BOOST;
            }
        }

        partial.confidence = clamp_strategy_confidence(confidence);
        debug!(
            lab = %self.lab,
            confidence = partial.confidence,
            fields = partial.filled_fields(),
            "Lab-specific strategy finished"
        );
        partial
    }
}

fn find_batch(profile: &LabProfile, text: &str) -> Option<String> {
    profile.batch.captures_iter(text).find_map(|caps| {
        let raw = caps[1].trim();
        match profile.batch_prefix {
            Some(prefix) => Some(format!("{prefix}{}", repair_numeric_token(raw))),
            // Free-form ids must contain a digit; "Batch: Pending" is not an id
            None if raw.chars().any(|c| c.is_ascii_digit()) => Some(raw.to_uppercase()),
            None => None,
        }
    })
}

fn find_strain(profile: &LabProfile, text: &str) -> Option<(String, Option<String>)> {
    let caps = profile.strain.captures(text)?;
    let name = caps[1].trim().trim_end_matches(['-', ',', ';']).trim();
    if name.is_empty() {
        return None;
    }
    let category = caps.get(2).map(|m| normalize_category(m.as_str()));
    Some((name.to_string(), category))
}

/// "FLOWER" → "Flower", "PRE-ROLL" → "Pre-Roll".
fn normalize_category(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.starts_with("pre") {
        return "Pre-Roll".to_string();
    }
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Text searched for cannabinoid values: the lab's potency section when its
/// header is present, otherwise the whole document.
fn potency_region<'a>(profile: &LabProfile, text: &'a str) -> &'a str {
    match profile.potency_section.find(text) {
        Some(m) => char_window(text, m.start(), m.start() + POTENCY_SECTION_SPAN),
        None => text,
    }
}
