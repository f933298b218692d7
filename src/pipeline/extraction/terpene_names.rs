//! Terpene vocabulary and canonical naming.
//!
//! Lab reports spell the same analyte many ways (`β-Myrcene`, `beta-Myrcene`,
//! `MYRCENE`). Names are reduced to a lookup key (lowercase, Greek letters
//! spelled out, qualifiers hyphenated) and mapped through a fixed table.

/// Name fragments identifying a terpene row. Longer fragments first so
/// "caryophyllene oxide" wins over "caryophyllene".
pub const TERPENE_FRAGMENTS: &[&str] = &[
    "caryophyllene oxide",
    "caryophyllene",
    "myrcene",
    "limonene",
    "linalool",
    "pinene",
    "humulene",
    "terpinolene",
    "terpineol",
    "terpinene",
    "ocimene",
    "bisabolol",
    "nerolidol",
    "eucalyptol",
    "cineole",
    "geraniol",
    "camphene",
    "fenchol",
    "fenchone",
    "borneol",
    "guaiol",
    "valencene",
    "phellandrene",
    "carene",
    "sabinene",
    "isopulegol",
    "pulegone",
    "cedrol",
    "farnesene",
    "citronellol",
    "menthol",
    "nerol",
];

/// Lookup key → canonical display name.
const CANONICAL_NAMES: &[(&str, &str)] = &[
    ("alpha-bisabolol", "Bisabolol"),
    ("alpha-cedrene", "Cedrene"),
    ("alpha-humulene", "Humulene"),
    ("alpha-phellandrene", "Phellandrene"),
    ("alpha-pinene", "Alpha-Pinene"),
    ("alpha-terpinene", "Alpha-Terpinene"),
    ("alpha-terpineol", "Terpineol"),
    ("beta-caryophyllene", "Caryophyllene"),
    ("beta-farnesene", "Farnesene"),
    ("beta-myrcene", "Myrcene"),
    ("beta-ocimene", "Ocimene"),
    ("beta-pinene", "Beta-Pinene"),
    ("1,8-cineole", "Eucalyptol"),
    ("caryophyllene oxide", "Caryophyllene Oxide"),
    ("d-limonene", "Limonene"),
    ("delta-3-carene", "Carene"),
    ("3-carene", "Carene"),
    ("fenchyl alcohol", "Fenchol"),
    ("gamma-terpinene", "Gamma-Terpinene"),
    ("trans-caryophyllene", "Caryophyllene"),
];

/// Qualifiers dropped when the full key is not in the table.
const QUALIFIERS: &[&str] = &["trans-", "cis-", "d-", "l-", "(+)-", "(-)-", "(r)-", "(s)-"];

/// Find the vocabulary fragment present in a piece of text, if any.
pub fn find_fragment(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    TERPENE_FRAGMENTS
        .iter()
        .copied()
        .find(|fragment| lower.contains(fragment))
}

/// Map a raw analyte name to its canonical English form.
///
/// Unrecognized names are title-cased.
pub fn canonical_terpene_name(raw: &str) -> String {
    let key = lookup_key(raw);
    if key.is_empty() {
        return String::new();
    }

    if let Some(name) = table_lookup(&key) {
        return name.to_string();
    }

    let mut stripped = key.as_str();
    while let Some(rest) = QUALIFIERS.iter().find_map(|q| stripped.strip_prefix(q)) {
        stripped = rest;
    }
    if let Some(name) = table_lookup(stripped) {
        return name.to_string();
    }
    // Qualifier-only difference (e.g. "trans-nerolidol") collapses to the bare name
    if stripped != key && TERPENE_FRAGMENTS.contains(&stripped) {
        return title_case(stripped);
    }

    title_case(&key)
}

fn table_lookup(key: &str) -> Option<&'static str> {
    CANONICAL_NAMES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
}

/// Lowercase, spell out Greek letters, normalize separators.
fn lookup_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.trim().chars() {
        match c {
            'α' | 'Α' => out.push_str("alpha-"),
            'β' | 'Β' | 'ß' => out.push_str("beta-"),
            'γ' | 'Γ' => out.push_str("gamma-"),
            'δ' | 'Δ' => out.push_str("delta-"),
            '\u{2010}'..='\u{2013}' | '_' => out.push('-'),
            c => out.extend(c.to_lowercase()),
        }
    }
    let collapsed = out
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("- ", "-")
        .replace(" -", "-");
    let mut key = collapsed;
    while key.contains("--") {
        key = key.replace("--", "-");
    }
    // "alpha pinene" → "alpha-pinene"
    for greek in ["alpha", "beta", "gamma", "delta"] {
        let spaced = format!("{greek} ");
        if let Some(rest) = key.strip_prefix(&spaced) {
            key = format!("{greek}-{rest}");
        }
    }
    key.trim_matches(|c: char| c == '-' || c == ':' || c == '*' || c.is_whitespace())
        .to_string()
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut capitalize = true;
    for c in text.chars() {
        if capitalize && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            capitalize = false;
        } else {
            out.extend(c.to_lowercase());
        }
        if c == ' ' || c == '-' {
            capitalize = true;
        }
    }
    out
}
