use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::ExtractionStrategy;
use crate::models::{ExtractionMethod, PartialRecord};
use crate::pipeline::extraction::confidence::clamp_strategy_confidence;
use crate::pipeline::extraction::normalize::{contains_below_detection, Unit};
use crate::pipeline::extraction::table_detect::is_tabular_line;
use crate::pipeline::extraction::terpenes::locate_panel_range;

const BASE_CONFIDENCE: u32 = 20;
const FIELD_BONUS: u32 = 10;

const THC_WINDOW: RangeInclusive<f64> = 15.0..=35.0;
const CBD_WINDOW: RangeInclusive<f64> = 0.01..=5.0;
const TOTAL_WINDOW: RangeInclusive<f64> = 15.0..=40.0;

/// Total cannabinoids may exceed THC by at most this many points.
const TOTAL_ABOVE_THC_MAX: f64 = 10.0;

/// Characters after a token inspected for a mass unit.
const UNIT_LOOKAHEAD: usize = 8;

static DECIMAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}\.\d{1,3}\b").unwrap());

static POTENCY_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:thc|cb[dgnc]|cannabinoids?|potency)").unwrap());

/// `THCA`, `THC-A`, `CBDa`: acid-form rows share the neutral ranges.
static ACID_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:thc|cbd)[\s\-]?a\b").unwrap());

/// Classifies bare decimal numbers by plausible magnitude. Knows nothing
/// about labels, so it is the weakest structured signal.
pub struct NumericalRangeStrategy;

impl ExtractionStrategy for NumericalRangeStrategy {
    fn extract(&self, text: &str) -> PartialRecord {
        let tokens = percent_candidates(text);

        let thc = tokens.iter().find(|(_, v)| THC_WINDOW.contains(v)).copied();
        let cbd = tokens.iter().find(|(_, v)| CBD_WINDOW.contains(v)).map(|(_, v)| *v);
        let total = thc.and_then(|(thc_pos, thc_value)| {
            tokens
                .iter()
                .find(|(pos, v)| {
                    *pos != thc_pos
                        && TOTAL_WINDOW.contains(v)
                        && *v >= thc_value
                        && *v <= thc_value + TOTAL_ABOVE_THC_MAX
                })
                .map(|(_, v)| *v)
        });

        let mut partial = PartialRecord::new(ExtractionMethod::NumericalRanges, 0);
        let mut confidence = BASE_CONFIDENCE;
        if let Some((_, value)) = thc {
            partial.thc_percentage = Some(value);
            confidence += FIELD_BONUS;
        }
        if let Some(value) = cbd {
            partial.cbd_percentage = Some(value);
            confidence += FIELD_BONUS;
        }
        if let Some(value) = total {
            partial.total_cannabinoids = Some(value);
            confidence += FIELD_BONUS;
        }
        partial.confidence = clamp_strategy_confidence(confidence);

        debug!(
            tokens = tokens.len(),
            confidence = partial.confidence,
            "Numerical-range strategy finished"
        );
        partial
    }
}

/// Decimal tokens with their byte offsets, outside the terpene panel.
fn percent_candidates(text: &str) -> Vec<(usize, f64)> {
    let panel = locate_panel_range(text);
    DECIMAL_TOKEN
        .find_iter(text)
        .filter(|m| panel.as_ref().map_or(true, |p| !p.contains(&m.start())))
        .filter(|m| reads_as_percent(text, m.start(), m.end()))
        .filter_map(|m| m.as_str().parse::<f64>().ok().map(|v| (m.start(), v)))
        .collect()
}

/// A token reads as a percentage when followed by `%` or on a line naming a
/// cannabinoid. Never for dotted dates and versions, mass-unit amounts, rows
/// reporting below detection or an acid form, or table cells after a row's
/// first number.
fn reads_as_percent(text: &str, start: usize, end: usize) -> bool {
    let rest = &text[end..];
    if part_of_dotted_sequence(&text[..start], rest) || followed_by_mass_unit(rest) {
        return false;
    }
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = rest.find('\n').map_or(text.len(), |i| end + i);
    let line = &text[line_start..line_end];
    if contains_below_detection(line) || ACID_FORM.is_match(line) {
        return false;
    }
    if is_tabular_line(line)
        && DECIMAL_TOKEN.find(line).map(|first| line_start + first.start()) != Some(start)
    {
        return false;
    }
    rest.trim_start_matches(' ').starts_with('%') || POTENCY_CONTEXT.is_match(line)
}

/// `03.15.2024`, `v2.1.3`: the token touches another `.digit` group.
fn part_of_dotted_sequence(before: &str, after: &str) -> bool {
    matches!(before.as_bytes(), [.., b'0'..=b'9', b'.'])
        || matches!(after.as_bytes(), [b'.', b'0'..=b'9', ..])
}

fn followed_by_mass_unit(rest: &str) -> bool {
    let head: String = rest.chars().take(UNIT_LOOKAHEAD).collect();
    matches!(Unit::detect(&head), Some(Unit::MgPerG | Unit::UgPerG))
}
