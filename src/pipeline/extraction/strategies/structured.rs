use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use super::{first_test_date, ExtractionStrategy, PCT_NUMBER, THC_KEYWORD};
use crate::models::{ExtractionMethod, PartialRecord};
use crate::pipeline::extraction::confidence::clamp_strategy_confidence;
use crate::pipeline::extraction::normalize::{
    is_below_detection, parse_number, round_percent, to_percentage, valid_cbd, valid_thc,
    valid_total_cannabinoids, Unit,
};
use crate::pipeline::extraction::table_detect::{is_tabular_line, split_cells};

const BASE_CONFIDENCE: u32 = 30;
const THC_BONUS: u32 = 15;
const CBD_BONUS: u32 = 10;
const TOTAL_BONUS: u32 = 15;
const DATE_BONUS: u32 = 5;

/// Minimum letters for an upper-case line to count as a section header.
const MIN_HEADER_LETTERS: usize = 4;

static METHOD_CODE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:SOP[\s\-]?)?[A-Z]{2,5}[\s\-]\d{2,4}\b").unwrap());

static PAGE_MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*page\s+\d+(?:\s+of\s+\d+)?\s*$").unwrap());

/// Keyword, optional `:`/`=`/`-`, number, percent. Nothing else between.
fn adjacent_percent(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i){keyword}\s*[:=\-]?\s*{PCT_NUMBER}\s*%")).unwrap()
}

const CBD_KEYWORD: &str = r"\b(?:total\s+)?cbd\b";
const TOTAL_KEYWORD: &str = r"\btotal\s+(?:active\s+)?cannabinoids?\b";

static THC_ADJACENT: LazyLock<Regex> = LazyLock::new(|| adjacent_percent(THC_KEYWORD));
static CBD_ADJACENT: LazyLock<Regex> = LazyLock::new(|| adjacent_percent(CBD_KEYWORD));
static TOTAL_ADJACENT: LazyLock<Regex> = LazyLock::new(|| adjacent_percent(TOTAL_KEYWORD));

static THC_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^{THC_KEYWORD}$")).unwrap());
static CBD_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^{CBD_KEYWORD}$")).unwrap());
static TOTAL_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^{TOTAL_KEYWORD}$")).unwrap());

/// Which cannabinoid field a pattern feeds.
#[derive(Debug, Clone, Copy)]
enum Field {
    Thc,
    Cbd,
    Total,
}

impl Field {
    const ALL: [Field; 3] = [Field::Thc, Field::Cbd, Field::Total];

    fn inline(self) -> &'static Regex {
        match self {
            Field::Thc => &THC_ADJACENT,
            Field::Cbd => &CBD_ADJACENT,
            Field::Total => &TOTAL_ADJACENT,
        }
    }

    fn cell(self) -> &'static Regex {
        match self {
            Field::Thc => &THC_CELL,
            Field::Cbd => &CBD_CELL,
            Field::Total => &TOTAL_CELL,
        }
    }

    fn valid(self, value: f64) -> bool {
        match self {
            Field::Thc => valid_thc(value),
            Field::Cbd => valid_cbd(value),
            Field::Total => valid_total_cannabinoids(value),
        }
    }
}

/// Splits the text at layout markers and reads keyword/value pairs inside
/// each section, including keyword/value table rows.
pub struct StructuredPatternStrategy;

impl ExtractionStrategy for StructuredPatternStrategy {
    fn extract(&self, text: &str) -> PartialRecord {
        let mut found = SectionFindings::default();
        let sections = split_sections(text);
        for section in &sections {
            found.absorb(scan_section(section));
        }

        let mut partial = PartialRecord::new(ExtractionMethod::StructuredPatterns, 0);
        let mut confidence = BASE_CONFIDENCE;
        if let Some(thc) = found.thc {
            partial.thc_percentage = Some(thc);
            confidence += THC_BONUS;
        }
        if let Some(cbd) = found.cbd {
            partial.cbd_percentage = Some(cbd);
            confidence += CBD_BONUS;
        }
        if let Some(total) = found.total {
            partial.total_cannabinoids = Some(total);
            confidence += TOTAL_BONUS;
        }
        if let Some(date) = found.date {
            partial.test_date = Some(date);
            confidence += DATE_BONUS;
        }
        partial.confidence = clamp_strategy_confidence(confidence);

        debug!(
            sections = sections.len(),
            confidence = partial.confidence,
            fields = partial.filled_fields(),
            "Structured-pattern strategy finished"
        );
        partial
    }
}

#[derive(Debug, Default)]
struct SectionFindings {
    thc: Option<f64>,
    cbd: Option<f64>,
    total: Option<f64>,
    date: Option<DateTime<Utc>>,
}

impl SectionFindings {
    /// Earlier sections win.
    fn absorb(&mut self, other: SectionFindings) {
        self.thc = self.thc.or(other.thc);
        self.cbd = self.cbd.or(other.cbd);
        self.total = self.total.or(other.total);
        self.date = self.date.or(other.date);
    }

    fn slot(&mut self, field: Field) -> &mut Option<f64> {
        match field {
            Field::Thc => &mut self.thc,
            Field::Cbd => &mut self.cbd,
            Field::Total => &mut self.total,
        }
    }
}

/// Group lines into sections. A marker line opens a new section and belongs to it.
fn split_sections(text: &str) -> Vec<Vec<&str>> {
    let mut sections: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if is_section_marker(line) && !current.is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push(line);
    }
    if !current.is_empty() {
        sections.push(current);
    }
    sections
}

fn is_section_marker(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    PAGE_MARKER_LINE.is_match(trimmed)
        || METHOD_CODE_LINE.is_match(trimmed)
        || is_upper_case_header(trimmed)
}

/// "CANNABINOID PROFILE", "TERPENES BY GC-MS". Lines carrying a value are data, not headers.
fn is_upper_case_header(line: &str) -> bool {
    if line.contains('%') || line.contains(':') || is_tabular_line(line) {
        return false;
    }
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    letters >= MIN_HEADER_LETTERS && !line.chars().any(char::is_lowercase)
}

fn scan_section(lines: &[&str]) -> SectionFindings {
    let mut found = SectionFindings::default();
    let mut table_unit: Option<Unit> = None;

    for line in lines {
        if is_tabular_line(line) {
            let cells = split_cells(line);
            if cells.iter().all(|c| parse_number(c).is_none()) {
                // Column header row; remember its unit for the rows below
                table_unit = cells.iter().find_map(|c| Unit::detect(c)).or(table_unit);
                continue;
            }
            for field in Field::ALL {
                let slot = found.slot(field);
                if slot.is_none() {
                    *slot = table_row_value(&cells, field, table_unit);
                }
            }
        }

        for field in Field::ALL {
            let slot = found.slot(field);
            if slot.is_none() {
                *slot = field
                    .inline()
                    .captures_iter(line)
                    .filter_map(|caps| parse_number(&caps[1]))
                    .find(|v| field.valid(*v));
            }
        }

        if found.date.is_none() {
            found.date = first_test_date(line);
        }
    }
    found
}

/// `| THC | 24.5 | % |` or `| Total THC | 245 |` under an `mg/g` header.
fn table_row_value(cells: &[&str], field: Field, table_unit: Option<Unit>) -> Option<f64> {
    let (first, rest) = cells.split_first()?;
    if !field.cell().is_match(first) {
        return None;
    }
    // The result column comes first; an ND there means later cells are limits.
    let index = rest
        .iter()
        .position(|c| is_below_detection(c) || parse_number(c).is_some())?;
    let value = parse_number(rest[index])?;
    let unit = Unit::detect(rest[index])
        .or_else(|| rest[index + 1..].iter().find_map(|c| Unit::detect(c)))
        .or(table_unit)?;
    let percent = round_percent(to_percentage(value, unit));
    field.valid(percent).then_some(percent)
}
