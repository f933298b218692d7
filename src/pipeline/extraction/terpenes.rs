//! Terpene panel locator and parser.
//!
//! Locating is header-driven: no recognized panel header means no terpene
//! output, so stray numbers elsewhere in the COA never become terpenes.
//! Parsing runs a table-aware pass and, only if that yields nothing, a
//! plain-text fallback. Candidates from either pass are reduced into one map
//! keyed by canonical name (max value kept), then sorted and truncated.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::normalize::{
    is_below_detection, parse_number, round_percent, to_percentage, valid_terpene, Unit,
};
use super::table_detect::{has_column_separator, split_cells};
use super::terpene_names::{canonical_terpene_name, find_fragment, TERPENE_FRAGMENTS};
use crate::models::{ExtractionMethod, PartialRecord, Terpene};

/// Longest slice of text considered part of one panel.
pub const MAX_PANEL_SPAN: usize = 3000;

/// Entries kept when the panel is parsed on its own.
pub const DEFAULT_TERPENE_LIMIT: usize = 5;

/// Baseline confidence of the standalone terpene pass.
const TERPENE_PANEL_BASE_CONFIDENCE: u32 = 20;

/// Added to a terpene-bearing result when at least one terpene was found.
pub const TERPENE_CONFIDENCE_BOOST: u32 = 10;

/// Panel headers in priority order: method code, "TERPENES BY GC", "TERPENE PROFILE".
static PANEL_HEADERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:SOP[\s\-]?)?TRP[\s\-]?\d{2,3}\b").unwrap(),
        Regex::new(r"(?i)\bterpenes?\s+by\s+gc\b").unwrap(),
        Regex::new(r"(?i)\bterpene\s+profile\b").unwrap(),
    ]
});

/// Start of the next COA section after the terpene panel.
static SECTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^\s*(?:cannabinoids?\b|potency\b|pesticides?\b|heavy\s+metals\b|microbial|microbiological|mycotoxins?\b|residual\s+solvents?\b|moisture\b|water\s+activity\b|foreign\s+matter\b|filth\b|[a-z][a-z ]{2,40}\s+by\s+(?:hplc|uplc|lc|icp|qpcr|pcr|plating)\b)",
    )
    .unwrap()
});

/// Page boundary markers left by OCR providers.
static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:page\s+\d+\s*(?:of|/)\s*\d+|-+\s*page\s*\d*\s*-*)\s*$").unwrap()
});

/// Column labels carrying the measured amount.
static AMOUNT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:amount|result|conc(?:entration)?|mass|value|level)\b").unwrap()
});

/// Leading numeric token of a table cell, OCR confusions allowed after the first digit.
static CELL_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9][0-9OolIS]*(?:[.,][0-9OolIS]+)?)").unwrap());

/// `<name> … <number> <unit>` across the whole vocabulary.
static PLAIN_TEXT_ROW: LazyLock<Regex> = LazyLock::new(|| {
    let names = TERPENE_FRAGMENTS
        .iter()
        .map(|f| f.replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?i)\b((?:(?:alpha|beta|gamma|delta|trans|cis|[αβγδ])[\s\-]*|[dl]-)*(?:{names}))[^\n\d]{{0,40}}?(\d+(?:[.,]\d+)?)\s*(%|mg\s*/\s*g|[µu]g\s*/\s*g|mcg\s*/\s*g)"
    ))
    .unwrap()
});

/// Find the terpene panel, returning the slice from its header to the next
/// section marker, page marker or `MAX_PANEL_SPAN`, whichever comes first.
pub fn locate_panel(text: &str) -> Option<&str> {
    locate_panel_range(text).map(|range| &text[range])
}

/// Byte range of the panel `locate_panel` returns.
pub fn locate_panel_range(text: &str) -> Option<Range<usize>> {
    let header = PANEL_HEADERS.iter().find_map(|re| re.find(text))?;
    let start = header.start();
    let body_start = text[header.end()..]
        .find('\n')
        .map_or(text.len(), |i| header.end() + i);

    let mut end = floor_char_boundary(text, start.saturating_add(MAX_PANEL_SPAN));
    if let Some(m) = SECTION_MARKER.find(&text[body_start..]) {
        end = end.min(body_start + m.start());
    }
    if let Some(m) = PAGE_MARKER.find(&text[body_start..]) {
        end = end.min(body_start + m.start());
    }
    Some(start..end.max(body_start.min(text.len())))
}

/// True when the document carries a recognizable terpene panel header.
pub fn has_terpene_panel(text: &str) -> bool {
    PANEL_HEADERS.iter().any(|re| re.is_match(text))
}

/// Parse a located panel into at most `limit` terpenes, descending by percentage.
pub fn parse_panel(panel: &str, limit: usize) -> Vec<Terpene> {
    let table_rows = table_pass(panel);
    let candidates = if table_rows.is_empty() {
        plain_text_pass(panel)
    } else {
        table_rows
    };
    reduce_candidates(candidates, limit)
}

/// Locate and parse the terpene panel. Empty when no panel header exists.
pub fn extract_terpenes(text: &str) -> Vec<Terpene> {
    extract_terpenes_with_limit(text, DEFAULT_TERPENE_LIMIT)
}

pub fn extract_terpenes_with_limit(text: &str, limit: usize) -> Vec<Terpene> {
    match locate_panel(text) {
        Some(panel) => parse_panel(panel, limit),
        None => Vec::new(),
    }
}

/// Standalone terpene pass folded into the combiner. `None` when nothing was found.
pub fn terpene_partial(text: &str, limit: usize) -> Option<PartialRecord> {
    let terpenes = extract_terpenes_with_limit(text, limit);
    if terpenes.is_empty() {
        return None;
    }
    debug!(count = terpenes.len(), "Terpene panel parsed");
    let mut partial = PartialRecord::new(
        ExtractionMethod::TerpenePanel,
        TERPENE_PANEL_BASE_CONFIDENCE + TERPENE_CONFIDENCE_BOOST,
    );
    partial.terpenes = Some(terpenes);
    Some(partial)
}

/// Table-aware pass: learn the amount unit from the header row, then read rows.
fn table_pass(panel: &str) -> Vec<Terpene> {
    let mut header_unit: Option<Unit> = None;
    let mut amount_col: Option<usize> = None;
    let mut found = Vec::new();

    for line in panel.lines().filter(|l| has_column_separator(l)) {
        let cells = split_cells(line);
        if cells.is_empty() {
            continue;
        }

        if is_header_row(&cells) {
            amount_col = cells.iter().position(|c| AMOUNT_LABEL.is_match(c));
            header_unit = amount_col
                .and_then(|i| Unit::detect(cells[i]))
                .or_else(|| cells.iter().find_map(|c| Unit::detect(c)));
            continue;
        }

        if let Some(terpene) = parse_table_row(&cells, header_unit, amount_col) {
            found.push(terpene);
        }
    }

    found
}

/// A header row names an amount column (or a unit) and carries no numbers
/// or analyte names.
fn is_header_row(cells: &[&str]) -> bool {
    let has_data = cells
        .iter()
        .any(|c| leading_number(c).is_some() || find_fragment(c).is_some());
    if has_data {
        return false;
    }
    cells.iter().any(|c| AMOUNT_LABEL.is_match(c)) || cells.iter().any(|c| Unit::detect(c).is_some())
}

fn parse_table_row(
    cells: &[&str],
    header_unit: Option<Unit>,
    amount_col: Option<usize>,
) -> Option<Terpene> {
    let name_idx = cells.iter().position(|c| find_fragment(c).is_some())?;
    let raw_name = cells[name_idx];
    if raw_name.to_lowercase().contains("total") {
        return None;
    }

    let value_idx = amount_col
        .filter(|&i| i > name_idx && i < cells.len())
        .filter(|&i| leading_number(cells[i]).is_some() || is_below_detection(cells[i]))
        .or_else(|| nearest_value_cell(cells, name_idx))?;

    let value_cell = cells[value_idx];
    if is_below_detection(value_cell) {
        return None;
    }
    let value = leading_number(value_cell)?;

    let unit = Unit::detect(value_cell)
        .or(header_unit)
        .or_else(|| cells[name_idx + 1..].iter().find_map(|c| Unit::detect(c)))
        .unwrap_or(Unit::Percent);

    build_terpene(raw_name, value, unit)
}

/// First cell after the name holding a number or a below-detection marker.
fn nearest_value_cell(cells: &[&str], name_idx: usize) -> Option<usize> {
    (name_idx + 1..cells.len())
        .find(|&i| is_below_detection(cells[i]) || leading_number(cells[i]).is_some())
}

fn leading_number(cell: &str) -> Option<f64> {
    let caps = CELL_NUMBER.captures(cell.trim())?;
    parse_number(&caps[1])
}

/// Plain-text fallback: `<name> … <number> <unit>` on any line.
fn plain_text_pass(panel: &str) -> Vec<Terpene> {
    PLAIN_TEXT_ROW
        .captures_iter(panel)
        .filter_map(|caps| {
            let value = parse_number(&caps[2])?;
            let unit = Unit::detect(&caps[3])?;
            build_terpene(&caps[1], value, unit)
        })
        .collect()
}

fn build_terpene(raw_name: &str, value: f64, unit: Unit) -> Option<Terpene> {
    let percentage = round_percent(to_percentage(value, unit));
    if !valid_terpene(percentage) {
        return None;
    }
    let name = canonical_terpene_name(raw_name);
    if name.is_empty() {
        return None;
    }
    Some(Terpene { name, percentage })
}

/// Keep the maximum value per canonical name, then sort descending and truncate.
fn reduce_candidates(candidates: Vec<Terpene>, limit: usize) -> Vec<Terpene> {
    let best: BTreeMap<String, f64> =
        candidates
            .into_iter()
            .fold(BTreeMap::new(), |mut acc, Terpene { name, percentage }| {
                let slot = acc.entry(name).or_insert(percentage);
                if percentage > *slot {
                    *slot = percentage;
                }
                acc
            });

    let mut terpenes: Vec<Terpene> = best
        .into_iter()
        .map(|(name, percentage)| Terpene { name, percentage })
        .collect();
    terpenes.sort_by(|a, b| {
        b.percentage
            .total_cmp(&a.percentage)
            .then_with(|| a.name.cmp(&b.name))
    });
    terpenes.truncate(limit);
    terpenes
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
