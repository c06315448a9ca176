//! Text-block normalization: line breaks, hyphenation, whitespace and
//! paragraph boundaries.

use crate::model::{Clause, Document, Section};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeReport {
    pub sections_changed: usize,
    pub doc_notes_changed: usize,
    pub fields_changed: usize,
}

impl NormalizeReport {
    pub fn changed(&self) -> bool {
        self.fields_changed > 0
    }
}

pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Normalizes a raw text block. Lines are regrouped into paragraphs joined
/// by single spaces and separated by one blank line.
pub fn normalize_text_block(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let unified = normalize_line_breaks(text);
    let (lines, _) = merge_hyphenated_lines(unified.split('\n'));

    let mut paragraphs = Vec::<String>::new();
    let mut buffer = Vec::<String>::new();
    for raw_line in lines {
        let line = normalize_inline(&raw_line);
        if line.is_empty() || is_page_number_line(&line) {
            if !buffer.is_empty() {
                paragraphs.push(buffer.join(" "));
                buffer.clear();
            }
            continue;
        }
        buffer.push(line);
    }
    if !buffer.is_empty() {
        paragraphs.push(buffer.join(" "));
    }

    paragraphs.join("\n\n").trim().to_string()
}

fn normalize_inline(line: &str) -> String {
    let mut collapsed = String::with_capacity(line.len());
    let mut pending_space = false;
    for ch in line.chars() {
        if matches!(ch, ' ' | '\t' | '\u{00a0}') {
            pending_space = true;
            continue;
        }
        if pending_space {
            if !matches!(ch, ',' | '.' | ';' | ':' | '!' | '?') {
                collapsed.push(' ');
            }
            pending_space = false;
        }
        collapsed.push(ch);
    }

    collapsed.trim().to_string()
}

pub fn is_page_number_line(line: &str) -> bool {
    let trimmed = line.trim();
    (1..=3).contains(&trimmed.len()) && trimmed.chars().all(|ch| ch.is_ascii_digit())
}

fn merge_hyphenated_lines<'a>(lines: impl Iterator<Item = &'a str>) -> (Vec<String>, usize) {
    let mut merged = Vec::<String>::new();
    let mut merges = 0usize;

    for line in lines {
        if let Some(previous) = merged.last_mut() {
            if should_merge_hyphenated_pair(previous, line) {
                let keep = previous.trim_end().len() - 1;
                previous.truncate(keep);
                previous.push_str(line.trim_start());
                merges += 1;
                continue;
            }
        }
        merged.push(line.to_string());
    }

    (merged, merges)
}

fn should_merge_hyphenated_pair(current: &str, next: &str) -> bool {
    let Some(left) = current.trim_end().strip_suffix('-') else {
        return false;
    };

    let starts_with_lowercase = next
        .trim_start()
        .chars()
        .next()
        .map(|character| character.is_lowercase())
        .unwrap_or(false);
    if !starts_with_lowercase {
        return false;
    }

    left.chars()
        .last()
        .map(|character| character.is_alphanumeric() || character == '_')
        .unwrap_or(false)
}

fn normalize_field(value: &mut Option<String>) -> bool {
    let Some(current) = value.as_mut() else {
        return false;
    };
    normalize_string(current)
}

fn normalize_string(value: &mut String) -> bool {
    if value.trim().is_empty() {
        return false;
    }
    let normalized = normalize_text_block(value);
    if normalized == *value {
        return false;
    }
    *value = normalized;
    true
}

fn normalize_clause(clause: &mut Clause) -> usize {
    let mut changed = usize::from(normalize_field(&mut clause.text));
    for child in &mut clause.children {
        changed += normalize_clause(child);
    }
    changed
}

/// Returns the number of fields rewritten in `section`.
pub fn normalize_section(section: &mut Section) -> usize {
    let mut changed = usize::from(normalize_string(&mut section.heading));
    changed += usize::from(normalize_field(&mut section.text));
    changed += usize::from(normalize_field(&mut section.intro));

    if let Some(chapter) = section.chapter.as_mut() {
        changed += usize::from(normalize_string(&mut chapter.title));
    }
    for clause in &mut section.clauses {
        changed += normalize_clause(clause);
    }
    for amendment in &mut section.amendments {
        changed += usize::from(normalize_string(&mut amendment.note));
    }

    changed
}

pub fn normalize_document(document: &mut Document) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    for section in &mut document.sections {
        let changed = normalize_section(section);
        if changed > 0 {
            report.sections_changed += 1;
            report.fields_changed += changed;
        }
    }

    for chapter in &mut document.chapters {
        report.fields_changed += usize::from(normalize_string(&mut chapter.title));
    }

    for note in &mut document.document_notes {
        if normalize_string(&mut note.note) {
            report.doc_notes_changed += 1;
            report.fields_changed += 1;
        }
    }

    report
}
