/// Minimum number of tabular lines for a text to count as containing a table.
const MIN_TABLE_LINES: usize = 2;

/// True when the text contains at least two table-shaped lines.
pub fn has_tabular_structure(text: &str) -> bool {
    text.lines().filter(|l| is_tabular_line(l)).count() >= MIN_TABLE_LINES
}

/// Heuristic: a line looks tabular if it has multiple columns separated by
/// tabs, pipes, or consistent multi-space gaps.
///
/// Patterns detected:
/// - Tab-separated: "Myrcene\t5.1\tmg/g"
/// - Pipe-separated: "| Myrcene | 5.1 | mg/g |"
/// - Multi-space aligned: "Myrcene    5.1    mg/g"
pub fn is_tabular_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.len() < 5 {
        return false;
    }

    if trimmed.matches('\t').count() >= 2 {
        return true;
    }

    if trimmed.matches('|').count() >= 2 {
        return true;
    }

    count_multi_space_gaps(trimmed) >= 2
}

/// Split a table row into trimmed, non-empty cells.
///
/// Pipes and tabs are column separators; a row without either falls back to
/// runs of 3+ spaces.
pub fn split_cells(line: &str) -> Vec<&str> {
    let cells: Vec<&str> = if line.contains('|') {
        line.split('|').collect()
    } else if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split("   ").collect()
    };
    cells
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// True when the line carries an explicit column separator character.
pub fn has_column_separator(line: &str) -> bool {
    line.contains('|') || line.contains('\t')
}

/// Count runs of 3+ consecutive spaces that separate non-empty text segments.
fn count_multi_space_gaps(text: &str) -> usize {
    let mut count = 0;
    let mut in_gap = false;
    let mut gap_len = 0;

    for ch in text.chars() {
        if ch == ' ' {
            gap_len += 1;
            if gap_len >= 3 && !in_gap {
                in_gap = true;
                count += 1;
            }
        } else {
            in_gap = false;
            gap_len = 0;
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_separated_is_tabular() {
        assert!(is_tabular_line("Myrcene\t5.1\tmg/g"));
        assert!(is_tabular_line("Limonene\t0.21\t%\t0.01"));
    }

    #[test]
    fn pipe_separated_is_tabular() {
        assert!(is_tabular_line("| Analyte | Amount | LOQ |"));
        assert!(is_tabular_line("| Myrcene | 5.1 | mg/g |"));
    }

    #[test]
    fn multi_space_is_tabular() {
        assert!(is_tabular_line("Myrcene      5.1    mg/g"));
    }

    #[test]
    fn prose_is_not_tabular() {
        assert!(!is_tabular_line("This sample was tested by the lab."));
        assert!(!is_tabular_line("SAMPLE: CEREAL MILK (FLOWER)"));
    }

    #[test]
    fn empty_or_short_not_tabular() {
        assert!(!is_tabular_line(""));
        assert!(!is_tabular_line("   "));
        assert!(!is_tabular_line("a|b"));
    }

    #[test]
    fn counts_multiple_gaps() {
        assert_eq!(count_multi_space_gaps("A   B   C"), 2);
        assert_eq!(count_multi_space_gaps("A     B     C     D"), 3);
        assert_eq!(count_multi_space_gaps("Hello World"), 0);
    }

    #[test]
    fn structure_needs_two_rows() {
        assert!(!has_tabular_structure("| Myrcene | 5.1 |"));
        assert!(has_tabular_structure("| Myrcene | 5.1 |\n| Limonene | 2.0 |"));
        assert!(!has_tabular_structure("plain prose\nmore prose"));
    }

    #[test]
    fn split_cells_by_pipe() {
        assert_eq!(
            split_cells("| β-Myrcene | 5.1 | mg/g |"),
            vec!["β-Myrcene", "5.1", "mg/g"]
        );
    }

    #[test]
    fn split_cells_by_tab_and_spaces() {
        assert_eq!(split_cells("Myrcene\t5.1\tmg/g"), vec!["Myrcene", "5.1", "mg/g"]);
        assert_eq!(split_cells("Myrcene     5.1     mg/g"), vec!["Myrcene", "5.1", "mg/g"]);
    }

    #[test]
    fn column_separator_detection() {
        assert!(has_column_separator("Myrcene | 5.1"));
        assert!(has_column_separator("Myrcene\t5.1"));
        assert!(!has_column_separator("Myrcene 5.1 mg/g"));
    }
}
