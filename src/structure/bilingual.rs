//! Aligns a parsed primary-language document with the raw text of a
//! secondary-language edition of the same act.
//!
//! The secondary text is split into section-keyed spans by scanning for
//! section numerals at line starts. OCR output often separates a numeral
//! from its delimiter or from the first "(1)" clause, so two marker shapes
//! are recognised:
//!
//! * leading digits followed by `.` or `)`, or by nothing when the next
//!   non-blank line opens with punctuation or Devanagari text;
//! * two or three digits followed (possibly on the next line) by `(1)`.

use std::collections::BTreeMap;

use crate::model::{BilingualEntry, Document, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionKeying {
    /// Key spans by the numeral found in the text.
    #[default]
    Detected,
    /// Key spans 1, 2, 3, ... in the order they appear.
    Sequential,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SplitOptions {
    pub keying: SectionKeying,
    pub max_section: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerShape {
    Delimited,
    BeforeFirstClause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SectionMarker<'a> {
    start: usize,
    digits: &'a str,
    shape: MarkerShape,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentResult {
    pub entries: Vec<BilingualEntry>,
    /// Primary sections with no secondary span, in numeric order.
    pub gaps: Vec<String>,
}

fn is_devanagari(ch: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&ch) || ch == '\u{0964}'
}

fn opens_continuation(ch: char) -> bool {
    matches!(ch, '(' | ')' | ',' | ';' | ':' | '-' | ']') || is_devanagari(ch)
}

fn leading_digits(text: &str) -> &str {
    let end = text
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    &text[..end]
}

/// `(start offset, line)` pairs over `text` without the line terminators.
fn lines_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        lines.push((offset, line.trim_end_matches(['\n', '\r'])));
        offset += line.len();
    }
    lines
}

fn next_nonblank<'a>(lines: &[(usize, &'a str)], index: usize) -> Option<&'a str> {
    lines[index + 1..]
        .iter()
        .map(|(_, line)| line.trim_start())
        .find(|line| !line.is_empty())
}

fn scan_markers(text: &str) -> Vec<SectionMarker<'_>> {
    let lines = lines_with_offsets(text);
    let mut markers = Vec::new();

    for (index, (offset, line)) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let digits = leading_digits(trimmed);
        if digits.is_empty() {
            continue;
        }
        let after = trimmed[digits.len()..].trim_start();
        let following = || next_nonblank(&lines, index);

        let delimited = match after.chars().next() {
            Some('.' | ')') => true,
            Some(_) => false,
            None => following()
                .and_then(|next| next.chars().next())
                .is_some_and(opens_continuation),
        };
        if delimited {
            markers.push(SectionMarker {
                start: *offset,
                digits,
                shape: MarkerShape::Delimited,
            });
        }

        let clause_follows = if after.is_empty() {
            following().is_some_and(|next| next.starts_with("(1)"))
        } else {
            after.starts_with("(1)")
        };
        if (2..=3).contains(&digits.len()) && clause_follows {
            markers.push(SectionMarker {
                start: *offset,
                digits,
                shape: MarkerShape::BeforeFirstClause,
            });
        }
    }

    markers
}

/// Splits secondary text into spans keyed by section number. Each span runs
/// from its marker to the next marker and is trimmed.
pub fn split_secondary_sections(text: &str, options: SplitOptions) -> BTreeMap<u32, String> {
    let all = scan_markers(text);
    let markers: Vec<SectionMarker<'_>> = match options.keying {
        SectionKeying::Detected => {
            let mut by_start = BTreeMap::<usize, SectionMarker<'_>>::new();
            for marker in all {
                by_start.entry(marker.start).or_insert(marker);
            }
            by_start.into_values().collect()
        }
        SectionKeying::Sequential => all
            .into_iter()
            .filter(|marker| marker.shape == MarkerShape::Delimited)
            .collect(),
    };

    let mut sections = BTreeMap::new();
    let mut sequence = 1u32;
    for (index, marker) in markers.iter().enumerate() {
        let end = markers
            .get(index + 1)
            .map(|next| next.start)
            .unwrap_or(text.len());

        let key = match options.keying {
            SectionKeying::Detected => {
                let Ok(key) = marker.digits.parse::<u32>() else {
                    continue;
                };
                if options.max_section.is_some_and(|max| key > max) {
                    continue;
                }
                if sections.contains_key(&key) {
                    continue;
                }
                key
            }
            SectionKeying::Sequential => {
                if options.max_section.is_some_and(|max| sequence > max) {
                    break;
                }
                let key = sequence;
                sequence += 1;
                key
            }
        };

        sections.insert(key, text[marker.start..end].trim().to_string());
    }

    sections
}

/// Primary sections keyed by the leading digits of their number; the first
/// section wins when several share a numeral ("21" and "21A").
pub fn primary_sections_by_number(
    document: &Document,
    max_section: Option<u32>,
) -> BTreeMap<u32, &Section> {
    let mut ordered = BTreeMap::new();
    for section in &document.sections {
        let Ok(number) = leading_digits(section.number.trim()).parse::<u32>() else {
            continue;
        };
        if max_section.is_some_and(|max| number > max) {
            continue;
        }
        ordered.entry(number).or_insert(section);
    }
    ordered
}

pub fn align_sections(
    document: &Document,
    secondary: &BTreeMap<u32, String>,
    secondary_language: &str,
    secondary_source: &str,
    max_section: Option<u32>,
) -> AlignmentResult {
    let mut result = AlignmentResult::default();

    for (number, section) in primary_sections_by_number(document, max_section) {
        let Some(secondary_text) = secondary.get(&number).filter(|text| !text.is_empty()) else {
            result.gaps.push(number.to_string());
            continue;
        };

        result.entries.push(BilingualEntry {
            act_id: document.act_id.clone(),
            section_number: number.to_string(),
            heading: section.heading.clone(),
            text: section.text.clone().unwrap_or_default(),
            secondary_language: secondary_language.to_string(),
            secondary_text: secondary_text.clone(),
            secondary_source: secondary_source.to_string(),
        });
    }

    result
}

const DEVANAGARI_DIGIT_ZERO: u32 = 0x0966;

fn ascii_digit(ch: char) -> char {
    let code = ch as u32;
    if (DEVANAGARI_DIGIT_ZERO..DEVANAGARI_DIGIT_ZERO + 10).contains(&code) {
        char::from_digit(code - DEVANAGARI_DIGIT_ZERO, 10).unwrap_or(ch)
    } else {
        ch
    }
}

/// Repairs OCR damage to section numerals in secondary text: Devanagari
/// digits become ASCII, `12: ` and `12- ` become `12. `, and a numeral left
/// alone on its line is joined to a following `(` line.
pub fn normalize_secondary_numerals(text: &str) -> String {
    let converted: String = text.chars().map(ascii_digit).collect();
    let trailing_newline = converted.ends_with('\n');
    let lines: Vec<&str> = converted.lines().collect();

    let mut output = Vec::<String>::with_capacity(lines.len());
    let mut index = 0;
    while index < lines.len() {
        let line = lines[index];
        let trimmed = line.trim();
        let digits = leading_digits(trimmed);

        if (1..=3).contains(&digits.len()) && digits.len() == trimmed.len() {
            let next = lines[index + 1..]
                .iter()
                .position(|candidate| !candidate.trim().is_empty())
                .map(|offset| index + 1 + offset);
            if let Some(next) = next.filter(|next| lines[*next].trim_start().starts_with('(')) {
                output.push(format!("{digits}. {}", lines[next].trim_start()));
                index = next + 1;
                continue;
            }
        }

        output.push(repair_delimiter(line));
        index += 1;
    }

    let mut joined = output.join("\n");
    if trailing_newline {
        joined.push('\n');
    }
    joined
}

fn repair_delimiter(line: &str) -> String {
    let stripped = line.trim_start();
    let indent = &line[..line.len() - stripped.len()];
    let digits = leading_digits(stripped);
    if !(1..=3).contains(&digits.len()) {
        return line.to_string();
    }

    let after = stripped[digits.len()..].trim_start();
    let Some(rest) = after
        .strip_prefix(':')
        .or_else(|| after.strip_prefix('：'))
        .or_else(|| after.strip_prefix('-'))
        .or_else(|| after.strip_prefix('–'))
    else {
        return line.to_string();
    };

    format!("{indent}{digits}. {}", rest.trim_start())
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(numbers: &[&str]) -> Document {
        let sections = numbers
            .iter()
            .map(|number| {
                let mut section = Section::new(*number, format!("Heading {number}"));
                section.text = Some(format!("English text {number}"));
                section
            })
            .collect();
        Document {
            act_id: "BNS-2023".to_string(),
            language: "en".to_string(),
            sections,
            chapters: Vec::new(),
            document_notes: Vec::new(),
        }
    }

    #[test]
    fn missing_secondary_marker_is_reported_as_gap() {
        let secondary = "1. पहली धारा का पाठ\nजारी\n3. तीसरी धारा\n";
        let spans = split_secondary_sections(secondary, SplitOptions::default());
        let result = align_sections(&document(&["1", "2", "3"]), &spans, "hi", "bns_hi.txt", None);

        assert_eq!(result.gaps, vec!["2".to_string()]);
        let numbers: Vec<&str> = result
            .entries
            .iter()
            .map(|entry| entry.section_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["1", "3"]);
        assert_eq!(result.entries[0].secondary_text, "1. पहली धारा का पाठ\nजारी");
        assert_eq!(result.entries[0].heading, "Heading 1");
        assert_eq!(result.entries[1].secondary_source, "bns_hi.txt");
    }

    #[test]
    fn numeral_alone_before_devanagari_line_is_a_marker() {
        let secondary = "12\nचोरी\n(1) जो कोई\n13) अगली\n";
        let spans = split_secondary_sections(secondary, SplitOptions::default());
        assert_eq!(spans.keys().copied().collect::<Vec<_>>(), vec![12, 13]);
        assert!(spans[&12].starts_with("12\nचोरी"));
    }

    #[test]
    fn split_numeral_before_first_clause_is_recovered() {
        let secondary = "101\n(1) हत्या\n102 (1) अगली धारा\n";
        let detected = split_secondary_sections(secondary, SplitOptions::default());
        assert_eq!(detected.keys().copied().collect::<Vec<_>>(), vec![101, 102]);

        let sequential = split_secondary_sections(
            secondary,
            SplitOptions {
                keying: SectionKeying::Sequential,
                max_section: None,
            },
        );
        // "101" alone before "(1)" also qualifies as a delimited marker;
        // "102 (1)" does not.
        assert_eq!(sequential.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert!(sequential[&1].contains("102 (1)"));
    }

    #[test]
    fn detected_keys_keep_first_occurrence_and_respect_bound() {
        let secondary = "5. first\n6. second\n5. repeated\n9. beyond\n";
        let spans = split_secondary_sections(
            secondary,
            SplitOptions {
                keying: SectionKeying::Detected,
                max_section: Some(6),
            },
        );
        assert_eq!(spans.keys().copied().collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(spans[&5], "5. first");
    }

    #[test]
    fn sequential_keys_ignore_detected_numbers() {
        let secondary = "7. a\n9. b\n10. c\n";
        let spans = split_secondary_sections(
            secondary,
            SplitOptions {
                keying: SectionKeying::Sequential,
                max_section: Some(2),
            },
        );
        assert_eq!(spans.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(spans[&2], "9. b");
    }

    #[test]
    fn primary_sections_deduplicate_by_leading_digits() {
        let doc = document(&["21", "21A", "3"]);
        let primary = primary_sections_by_number(&doc, None);
        assert_eq!(primary.keys().copied().collect::<Vec<_>>(), vec![3, 21]);
        assert_eq!(primary[&21].number, "21");
    }

    #[test]
    fn numeral_repair_fixes_digits_delimiters_and_spills() {
        let raw = "१२: चोरी\n  45- हत्या\n7\n\n(1) जो कोई\nसामान्य पाठ\n";
        assert_eq!(
            normalize_secondary_numerals(raw),
            "12. चोरी\n  45. हत्या\n7. (1) जो कोई\nसामान्य पाठ\n"
        );
    }

    #[test]
    fn numeral_repair_is_idempotent() {
        let raw = "3: पाठ\n4\n(1) खंड\n";
        let once = normalize_secondary_numerals(raw);
        assert_eq!(normalize_secondary_numerals(&once), once);
    }
}
