//! Amendment footnote detection and accumulation.

use crate::model::{Footnote, FootnoteKind};
use crate::tables::{AMENDMENT_INDICATORS, footnote_kind_for};
use crate::util::collapse_whitespace;

/// First line of a footnote block, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteStart<'a> {
    pub marker: &'a str,
    pub kind: FootnoteKind,
    pub rest: &'a str,
}

/// Recognizes `"<digits><kind word> ... <amendment indicator> ..."`.
///
/// The character after the digits must not be `.` (a section start) or
/// `[` (an inline amendment marker).
pub fn detect_footnote_start(line: &str) -> Option<FootnoteStart<'_>> {
    let digits_end = line
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(index, _)| index)?;
    if digits_end == 0 {
        return None;
    }

    let next = line[digits_end..].chars().next()?;
    if matches!(next, '.' | '[') {
        return None;
    }

    let rest = line[digits_end..].trim();
    let first_word = rest.split_whitespace().next()?;
    let kind = footnote_kind_for(first_word)?;

    let lowered = rest.to_lowercase();
    if !AMENDMENT_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
    {
        return None;
    }

    Some(FootnoteStart {
        marker: &line[..digits_end],
        kind,
        rest,
    })
}

/// An open footnote block collecting continuation lines.
#[derive(Debug, Clone)]
pub struct FootnoteBlock {
    marker: String,
    kind: FootnoteKind,
    parts: Vec<String>,
}

impl FootnoteBlock {
    pub fn open(start: &FootnoteStart<'_>) -> Self {
        Self {
            marker: start.marker.to_string(),
            kind: start.kind,
            parts: vec![start.rest.to_string()],
        }
    }

    pub fn push_line(&mut self, line: &str) {
        self.parts.push(line.to_string());
    }

    pub fn finish(self) -> Footnote {
        Footnote {
            marker: self.marker,
            kind: self.kind,
            note: collapse_whitespace(&self.parts.join(" ")),
        }
    }
}
