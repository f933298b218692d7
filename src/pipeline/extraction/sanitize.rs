/// Clean raw OCR output before pattern matching.
///
/// Strips control and replacement characters, markdown emphasis/heading markers
/// and markdown table separator rows. Keeps `|` and tabs (table structure) and
/// the unit symbols COAs rely on (`%`, `µ`, `<`, `/`).
pub fn clean_ocr_text(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '\u{000C}' => Some('\n'),
            '\u{00A0}' | '\u{2007}' | '\u{202F}' => Some(' '),
            // Greek small mu and micro sign look identical; keep one spelling
            '\u{03BC}' => Some('\u{00B5}'),
            '\u{FFFD}' => None,
            '\n' | '\t' => Some(c),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect::<String>()
        .lines()
        .map(clean_line)
        .filter(|l| !l.is_empty() && !is_markdown_separator(l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove markdown decoration from a single line and trim it.
fn clean_line(line: &str) -> String {
    let trimmed = line.trim();
    let without_heading = trimmed.trim_start_matches('#').trim_start();
    without_heading
        .replace("**", "")
        .replace("__", "")
        .trim()
        .to_string()
}

/// Markdown table separator rows such as `|---|:---:|`.
fn is_markdown_separator(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t' | '+'))
}

/// Share of characters outside what a clean English COA contains.
pub fn non_standard_char_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut odd = 0usize;
    for c in text.chars() {
        if c.is_whitespace() {
            continue;
        }
        total += 1;
        let standard = c.is_ascii_alphanumeric()
            || c.is_ascii_punctuation()
            || matches!(c, 'µ' | 'α' | 'β' | 'γ' | 'δ' | 'Δ' | '°' | '±' | '≤' | '≥');
        if !standard {
            odd += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    odd as f64 / total as f64
}
