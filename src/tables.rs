//! Canonical lookup tables shared by every structuring stage.
//!
//! Everything here is immutable static data. Stages receive these by
//! reference instead of consulting module-level mutable state.

use crate::model::{ClauseKind, FootnoteKind};

/// Maximum nesting depth allowed for a clause tree.
pub const MAX_CLAUSE_DEPTH: usize = 4;

/// Official ordering of constitutional part codes.
pub const CONSTITUTION_PART_ORDER: &[&str] = &[
    "I", "II", "III", "IV", "IVA", "V", "VI", "VII", "VIII", "IX", "IXA", "X", "XI", "XII",
    "XIII", "XIV", "XIVA", "XV", "XVI", "XVII", "XVIII", "XIX", "XX", "XXI", "XXII",
];

/// Leading word of a footnote block mapped to the amendment kind it records.
pub const FOOTNOTE_KIND_WORDS: &[(&str, FootnoteKind)] = &[
    ("subs", FootnoteKind::Substitution),
    ("ins", FootnoteKind::Insertion),
    ("added", FootnoteKind::Addition),
    ("omitted", FootnoteKind::Omission),
    ("the", FootnoteKind::Note),
    ("art", FootnoteKind::Note),
    ("article", FootnoteKind::Note),
    ("clause", FootnoteKind::Note),
    ("clauses", FootnoteKind::Note),
    ("proviso", FootnoteKind::Note),
    ("provisos", FootnoteKind::Note),
    ("now", FootnoteKind::Note),
    ("this", FootnoteKind::Note),
    ("these", FootnoteKind::Note),
    ("paragraph", FootnoteKind::Note),
    ("section", FootnoteKind::Note),
    ("words", FootnoteKind::Note),
    ("explanation", FootnoteKind::Note),
];

/// Phrases that must appear somewhere in a footnote block's first line.
pub const AMENDMENT_INDICATORS: &[&str] = &["amendment", "act", "w.e.f.", "ibid", "vide", "gazette"];

/// Ordinal words naming schedules, mapped to their canonical token.
pub const SCHEDULE_ORDINALS: &[(&str, &str)] = &[
    ("first", "FIRST"),
    ("second", "SECOND"),
    ("third", "THIRD"),
    ("fourth", "FOURTH"),
    ("fifth", "FIFTH"),
    ("sixth", "SIXTH"),
    ("seventh", "SEVENTH"),
    ("eighth", "EIGHTH"),
    ("ninth", "NINTH"),
    ("tenth", "TENTH"),
    ("eleventh", "ELEVENTH"),
    ("twelfth", "TWELFTH"),
];

/// Regex alternation of every schedule ordinal word.
pub const SCHEDULE_ORDINAL_ALTERNATION: &str =
    "first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|eleventh|twelfth";

pub fn footnote_kind_for(word: &str) -> Option<FootnoteKind> {
    let normalized = word.trim_end_matches('.').to_ascii_lowercase();
    FOOTNOTE_KIND_WORDS
        .iter()
        .find(|(candidate, _)| *candidate == normalized)
        .map(|(_, kind)| *kind)
}

pub fn schedule_token_for(ordinal: &str) -> Option<&'static str> {
    let normalized = ordinal.to_ascii_lowercase();
    SCHEDULE_ORDINALS
        .iter()
        .find(|(word, _)| *word == normalized)
        .map(|(_, token)| *token)
}

/// Canonical nesting level of a clause marker type.
pub fn clause_level(kind: ClauseKind) -> usize {
    match kind {
        ClauseKind::Numeric => 1,
        ClauseKind::AlphaUpper | ClauseKind::AlphaLower => 2,
        ClauseKind::Roman => 3,
    }
}

pub fn constitution_part_index(code: &str) -> Option<usize> {
    CONSTITUTION_PART_ORDER
        .iter()
        .position(|candidate| *candidate == code)
}

/// Orders roman chapter codes with an optional single-letter insertion
/// suffix ("IVA" sits between "IV" and "V").
pub fn roman_code_index(code: &str) -> Option<usize> {
    let upper = code.trim().to_ascii_uppercase();
    let (numeral, suffix) = match upper.char_indices().last() {
        Some((index, 'A')) if index > 0 && roman_value(&upper[..index]).is_some() => {
            (&upper[..index], 1usize)
        }
        _ => (upper.as_str(), 0usize),
    };

    roman_value(numeral).map(|value| value * 2 + suffix)
}

pub fn roman_value(numeral: &str) -> Option<usize> {
    if numeral.is_empty() {
        return None;
    }

    let mut total = 0usize;
    let mut previous = 0usize;
    for ch in numeral.chars().rev() {
        let value = match ch.to_ascii_uppercase() {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };
        if value < previous {
            total = total.checked_sub(value)?;
        } else {
            total += value;
            previous = value;
        }
    }

    (total > 0).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footnote_kind_lookup_strips_abbreviation_dot() {
        assert_eq!(footnote_kind_for("Subs."), Some(FootnoteKind::Substitution));
        assert_eq!(footnote_kind_for("Ins."), Some(FootnoteKind::Insertion));
        assert_eq!(footnote_kind_for("Omitted"), Some(FootnoteKind::Omission));
        assert_eq!(footnote_kind_for("Explanation"), Some(FootnoteKind::Note));
        assert_eq!(footnote_kind_for("Whoever"), None);
    }

    #[test]
    fn roman_codes_order_insertion_suffix_between_neighbours() {
        let iv = roman_code_index("IV").unwrap();
        let iva = roman_code_index("IVA").unwrap();
        let v = roman_code_index("V").unwrap();
        assert!(iv < iva && iva < v);
        assert_eq!(roman_value("XIX"), Some(19));
        assert_eq!(roman_code_index("Q"), None);
    }

    #[test]
    fn constitution_table_knows_inserted_parts() {
        assert_eq!(constitution_part_index("I"), Some(0));
        assert_eq!(constitution_part_index("IVA"), Some(4));
        assert!(constitution_part_index("XXIII").is_none());
    }
}
