use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{acid_suffix_follows, char_window, ExtractionStrategy, PCT_NUMBER};
use super::THC_KEYWORD as THC_PATTERN;
use crate::models::{ExtractionMethod, PartialRecord};
use crate::pipeline::extraction::confidence::clamp_strategy_confidence;
use crate::pipeline::extraction::normalize::{
    parse_number, starts_with_below_detection, valid_cbd, valid_thc, valid_total_cannabinoids,
};

const BASE_CONFIDENCE: u32 = 25;
const THC_BONUS: u32 = 15;
const CBD_BONUS: u32 = 10;
const TOTAL_BONUS: u32 = 15;

/// Default bytes inspected on each side of a keyword, within its line.
pub const DEFAULT_PROXIMITY_WINDOW: usize = 60;

static THC_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){THC_PATTERN}")).unwrap());
static CBD_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:total\s+)?cbd\b").unwrap());
static TOTAL_CANNABINOIDS_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btotal\s+(?:active\s+)?cannabinoids?\b").unwrap());
static CANNABINOID_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcannabinoids?\b").unwrap());

static PERCENT_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{PCT_NUMBER}\s*%")).unwrap());

/// Keyword-proximity search: the nearest valid percentage within a fixed
/// window of any keyword occurrence.
pub struct ContextualSearchStrategy {
    window: usize,
}

impl ContextualSearchStrategy {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Nearest valid value around the first keyword occurrence that has one.
    /// Both windows stop at the keyword's line; the one after the keyword is
    /// searched first. A below-detection marker right after the keyword
    /// settles the field as absent.
    fn near_keyword(&self, keyword: &Regex, text: &str, valid: fn(f64) -> bool) -> Option<f64> {
        for m in keyword.find_iter(text) {
            let rest = &text[m.end()..];
            if acid_suffix_follows(rest) {
                continue;
            }
            let line_start = text[..m.start()].rfind('\n').map_or(0, |i| i + 1);
            let line_end = rest.find('\n').map_or(text.len(), |i| m.end() + i);

            let after = char_window(text, m.end(), (m.end() + self.window).min(line_end));
            if starts_with_below_detection(after) {
                return None;
            }
            let before = char_window(
                text,
                m.start().saturating_sub(self.window).max(line_start),
                m.start(),
            );
            let value = percent_values(after)
                .into_iter()
                .find(|v| valid(*v))
                .or_else(|| percent_values(before).into_iter().rev().find(|v| valid(*v)));
            if value.is_some() {
                return value;
            }
        }
        None
    }
}

impl Default for ContextualSearchStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_WINDOW)
    }
}

impl ExtractionStrategy for ContextualSearchStrategy {
    fn extract(&self, text: &str) -> PartialRecord {
        let mut partial = PartialRecord::new(ExtractionMethod::ContextualSearch, 0);
        let mut confidence = BASE_CONFIDENCE;

        if let Some(thc) = self.near_keyword(&THC_KEYWORD, text, valid_thc) {
            partial.thc_percentage = Some(thc);
            confidence += THC_BONUS;
        }
        if let Some(cbd) = self.near_keyword(&CBD_KEYWORD, text, valid_cbd) {
            partial.cbd_percentage = Some(cbd);
            confidence += CBD_BONUS;
        }
        let total = self
            .near_keyword(&TOTAL_CANNABINOIDS_KEYWORD, text, valid_total_cannabinoids)
            .or_else(|| self.near_keyword(&CANNABINOID_KEYWORD, text, valid_total_cannabinoids));
        if let Some(total) = total {
            partial.total_cannabinoids = Some(total);
            confidence += TOTAL_BONUS;
        }

        partial.confidence = clamp_strategy_confidence(confidence);
        debug!(
            window = self.window,
            confidence = partial.confidence,
            "Contextual strategy finished"
        );
        partial
    }
}

/// Percent values in reading order. A number glued to a preceding digit or
/// decimal point is the tail of a longer token and is skipped.
fn percent_values(window: &str) -> Vec<f64> {
    PERCENT_VALUE
        .captures_iter(window)
        .filter_map(|caps| {
            let number = caps.get(1)?;
            let glued = window[..number.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == ',');
            if glued {
                return None;
            }
            parse_number(number.as_str())
        })
        .collect()
}
