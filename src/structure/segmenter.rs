//! Line-oriented state machine that splits an act into sections.
//!
//! Each line is classified once into a [`LineClass`]; the scan loop then
//! applies the transition for the current [`ScanState`]. Footnote blocks are
//! accumulated inline and attached to whichever section is open when they
//! close.

use std::collections::HashSet;

use anyhow::{Context, Result};
use regex::Regex;

use crate::acts::SegmentProfile;
use crate::error::StructuralViolation;
use crate::model::{Chapter, Document, Footnote, GroupKind, Section};
use crate::structure::clause_tree::{ClauseOptions, ClauseTreeBuilder, clean_bracket_artifacts};
use crate::structure::footnotes::{FootnoteBlock, FootnoteStart, detect_footnote_start};
use crate::structure::normalizer::normalize_line_breaks;
use crate::tables::SCHEDULE_ORDINAL_ALTERNATION;
use crate::util::collapse_whitespace;

/// Tolerance applied when a section number goes backwards under OCR noise.
const SECTION_REGRESSION_TOLERANCE: f64 = 0.5;
const MAX_TOPIC_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    BeforeStart,
    Scanning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass<'a> {
    FootnoteStart(FootnoteStart<'a>),
    GroupHeader {
        code: String,
        title: Option<String>,
    },
    ScheduleHeader(String),
    SectionStart {
        number: &'a str,
        heading: &'a str,
    },
    Body(&'a str),
}

#[derive(Debug)]
struct SectionDraft {
    number: String,
    heading: String,
    chapter: Option<Chapter>,
    subheading: Option<String>,
    schedule: Option<String>,
    lines: Vec<String>,
    amendments: Vec<Footnote>,
}

#[derive(Debug)]
struct ScanContext {
    state: ScanState,
    sections: Vec<Section>,
    chapters: Vec<Chapter>,
    document_notes: Vec<Footnote>,
    current_group: Option<usize>,
    group_title_pending: bool,
    current_schedule: Option<String>,
    current_topic: Option<String>,
    open_section: Option<SectionDraft>,
    open_footnote: Option<FootnoteBlock>,
    last_section_value: f64,
    seen_numbers: HashSet<String>,
}

impl ScanContext {
    fn new(profile: &SegmentProfile) -> Self {
        Self {
            state: if profile.require_start_trigger {
                ScanState::BeforeStart
            } else {
                ScanState::Scanning
            },
            sections: Vec::new(),
            chapters: Vec::new(),
            document_notes: Vec::new(),
            current_group: None,
            group_title_pending: false,
            current_schedule: None,
            current_topic: None,
            open_section: None,
            open_footnote: None,
            last_section_value: 0.0,
            seen_numbers: HashSet::new(),
        }
    }

    fn close_footnote(&mut self) {
        let Some(block) = self.open_footnote.take() else {
            return;
        };
        let footnote = block.finish();
        match self.open_section.as_mut() {
            Some(section) => section.amendments.push(footnote),
            None => self.document_notes.push(footnote),
        }
    }

    fn open_group(&mut self, kind: GroupKind, code: String, title: Option<String>) {
        let index = match self.chapters.iter().position(|chapter| chapter.code == code) {
            Some(index) => index,
            None => {
                self.chapters.push(Chapter {
                    kind,
                    code,
                    title: String::new(),
                });
                self.chapters.len() - 1
            }
        };

        match title {
            Some(title) => {
                self.chapters[index].title = title;
                self.group_title_pending = false;
            }
            None => self.group_title_pending = true,
        }
        self.current_group = Some(index);
        self.current_topic = None;
    }
}

#[derive(Debug)]
pub struct Segmenter {
    clause_builder: ClauseTreeBuilder,
    start_trigger: Regex,
    section_start: Regex,
    chapter_header: Regex,
    part_header: Regex,
    schedule_header: Regex,
    topic_line: Regex,
    heading_split: Regex,
    inline_section_break: Regex,
}

impl Segmenter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            clause_builder: ClauseTreeBuilder::new()?,
            start_trigger: Regex::new(r"^(?i)BE\s+it\s+enacted")
                .context("failed to compile start trigger regex")?,
            section_start: Regex::new(r"^(\d+[A-Z]?)\.\s*(.*)$")
                .context("failed to compile section start regex")?,
            chapter_header: Regex::new(r"^(?i)CHAPTER\s+([IVXLC]+A?)\b(.*)$")
                .context("failed to compile chapter header regex")?,
            part_header: Regex::new(r"^(?i)PART\s+([IVXLC]+A?)\b(.*)$")
                .context("failed to compile part header regex")?,
            schedule_header: Regex::new(&format!(
                r"^(?i)({SCHEDULE_ORDINAL_ALTERNATION})\s+SCHEDULE\b"
            ))
            .context("failed to compile schedule header regex")?,
            topic_line: Regex::new(r"^(?i:of\b.+|[A-Z][A-Z ',\-./&()]+)$")
                .context("failed to compile topic line regex")?,
            heading_split: Regex::new(r"\s*[-–—]{2,}\s*")
                .context("failed to compile heading split regex")?,
            inline_section_break: Regex::new(r"\.[ \t]+(\d+[A-Z]?\.\s)")
                .context("failed to compile inline section break regex")?,
        })
    }

    pub fn classify<'a>(&self, line: &'a str, profile: &SegmentProfile) -> LineClass<'a> {
        if let Some(start) = detect_footnote_start(line) {
            return LineClass::FootnoteStart(start);
        }

        if let Some((code, title)) = self.match_group_header(line, profile) {
            return LineClass::GroupHeader { code, title };
        }

        if self.schedule_header.is_match(line) {
            return LineClass::ScheduleHeader(collapse_whitespace(line));
        }

        if let Some(captures) = self.section_start.captures(line) {
            if let (Some(number), Some(heading)) = (captures.get(1), captures.get(2)) {
                return LineClass::SectionStart {
                    number: number.as_str(),
                    heading: heading.as_str().trim(),
                };
            }
        }

        LineClass::Body(line)
    }

    fn match_group_header(
        &self,
        line: &str,
        profile: &SegmentProfile,
    ) -> Option<(String, Option<String>)> {
        let regex = match profile.group_kind {
            GroupKind::Chapter => &self.chapter_header,
            GroupKind::Part => &self.part_header,
        };
        let captures = regex.captures(line)?;
        let code = captures.get(1)?.as_str().to_ascii_uppercase();
        let remainder = captures
            .get(2)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .trim_matches(|ch: char| ch.is_whitespace() || matches!(ch, '.' | ':' | '-' | '–' | '—'));

        if remainder.is_empty() {
            return Some((code, None));
        }
        if !profile.inline_group_titles {
            return None;
        }

        Some((code, Some(collapse_whitespace(remainder))))
    }

    fn starts_structure(&self, line: &str, profile: &SegmentProfile) -> bool {
        matches!(
            self.classify(line, profile),
            LineClass::GroupHeader { .. }
                | LineClass::ScheduleHeader(_)
                | LineClass::SectionStart { .. }
        )
    }

    /// Splits `text` into a [`Document`]. Clause trees are built as each
    /// section closes, so a depth violation aborts the whole act.
    pub fn segment(
        &self,
        text: &str,
        act_id: &str,
        language: &str,
        profile: &SegmentProfile,
    ) -> Result<Document, StructuralViolation> {
        let mut prepared = normalize_line_breaks(text);
        if profile.split_inline_sections {
            prepared = self
                .inline_section_break
                .replace_all(&prepared, ".\n${1}")
                .into_owned();
        }

        let options = ClauseOptions {
            strip_amendment_markers: profile.clean_bracket_artifacts,
        };
        let mut ctx = ScanContext::new(profile);

        for raw_line in prepared.lines() {
            let line = raw_line.replace('\x0c', " ");
            let line = line.trim();

            if line.is_empty() {
                ctx.close_footnote();
                continue;
            }

            if ctx.state == ScanState::BeforeStart {
                if self.start_trigger.is_match(line) {
                    ctx.state = ScanState::Scanning;
                }
                continue;
            }

            if line.chars().all(|ch| ch.is_ascii_digit()) {
                continue;
            }

            if let Some(block) = ctx.open_footnote.as_mut() {
                if detect_footnote_start(line).is_none() && !self.starts_structure(line, profile) {
                    block.push_line(line);
                    continue;
                }
                ctx.close_footnote();
            }

            let cleaned;
            let line = if profile.clean_bracket_artifacts {
                cleaned = clean_bracket_artifacts(line);
                if cleaned.is_empty() {
                    continue;
                }
                cleaned.as_str()
            } else {
                line
            };

            match self.classify(line, profile) {
                LineClass::FootnoteStart(start) => {
                    ctx.open_footnote = Some(FootnoteBlock::open(&start));
                }
                _ if ctx.group_title_pending && ctx.current_group.is_some() => {
                    if let Some(index) = ctx.current_group {
                        ctx.chapters[index].title = collapse_whitespace(line);
                    }
                    ctx.group_title_pending = false;
                }
                LineClass::GroupHeader { code, title } => {
                    self.close_section(&mut ctx, options, act_id)?;
                    ctx.open_group(profile.group_kind, code, title);
                }
                LineClass::ScheduleHeader(name) => {
                    self.close_section(&mut ctx, options, act_id)?;
                    ctx.current_schedule = Some(name);
                    ctx.current_group = None;
                    ctx.group_title_pending = false;
                    ctx.current_topic = None;
                }
                LineClass::SectionStart { number, heading } => {
                    let value = section_sort_value(number);
                    let regressed = value + SECTION_REGRESSION_TOLERANCE < ctx.last_section_value;
                    if regressed || ctx.seen_numbers.contains(number) {
                        // Stray numeral (OCR misread, list item or repeat), not a new section.
                        if let Some(section) = ctx.open_section.as_mut() {
                            section.lines.push(line.to_string());
                        }
                        continue;
                    }
                    ctx.last_section_value = ctx.last_section_value.max(value);
                    ctx.seen_numbers.insert(number.to_string());
                    self.close_section(&mut ctx, options, act_id)?;
                    self.open_section(&mut ctx, number, heading, profile);
                }
                LineClass::Body(body) => match ctx.open_section.as_mut() {
                    Some(section) => section.lines.push(body.to_string()),
                    None => {
                        if self.looks_like_topic(body) {
                            ctx.current_topic = Some(collapse_whitespace(body));
                        }
                    }
                },
            }
        }

        ctx.close_footnote();
        self.close_section(&mut ctx, options, act_id)?;

        Ok(Document {
            act_id: act_id.to_string(),
            language: language.to_string(),
            sections: ctx.sections,
            chapters: ctx.chapters,
            document_notes: ctx.document_notes,
        })
    }

    fn open_section(
        &self,
        ctx: &mut ScanContext,
        number: &str,
        heading_raw: &str,
        profile: &SegmentProfile,
    ) {
        let (heading, first_line) = if profile.split_heading_dash {
            self.split_heading_and_inline_text(heading_raw)
        } else {
            (collapse_whitespace(heading_raw), None)
        };

        ctx.open_section = Some(SectionDraft {
            number: number.to_string(),
            heading,
            chapter: ctx.current_group.map(|index| ctx.chapters[index].clone()),
            subheading: ctx.current_topic.clone(),
            schedule: ctx.current_schedule.clone(),
            lines: first_line.into_iter().collect(),
            amendments: Vec::new(),
        });
    }

    fn close_section(
        &self,
        ctx: &mut ScanContext,
        options: ClauseOptions,
        act_id: &str,
    ) -> Result<(), StructuralViolation> {
        let Some(draft) = ctx.open_section.take() else {
            return Ok(());
        };

        let mut section = Section::new(draft.number, draft.heading);
        section.chapter = draft.chapter;
        section.subheading = draft.subheading.filter(|value| !value.is_empty());
        section.schedule = draft.schedule;
        section.amendments = draft.amendments;

        let text = draft.lines.join("\n").trim().to_string();
        if !text.is_empty() {
            let tree = self
                .clause_builder
                .build(&text, options, act_id, &section.number)?;
            section.intro = tree.intro;
            section.clauses = tree.clauses;
            section.text = Some(text);
        }

        ctx.sections.push(section);
        Ok(())
    }

    fn split_heading_and_inline_text(&self, raw: &str) -> (String, Option<String>) {
        if raw.is_empty() {
            return (String::new(), None);
        }

        let mut parts = self.heading_split.splitn(raw, 2);
        let heading = parts.next().unwrap_or_default();
        match parts.next() {
            Some(remainder) => (
                collapse_whitespace(heading),
                Some(remainder.trim().to_string()).filter(|value| !value.is_empty()),
            ),
            None => (collapse_whitespace(raw), None),
        }
    }

    fn looks_like_topic(&self, line: &str) -> bool {
        if line.chars().count() > MAX_TOPIC_CHARS {
            return false;
        }
        if self.topic_line.is_match(line) && !line.ends_with('.') {
            return true;
        }
        line.to_lowercase().starts_with("of ")
    }
}

/// Numeric ordering value of a section label; a letter suffix adds a
/// fractional offset so that "21A" sorts after "21".
pub fn section_sort_value(label: &str) -> f64 {
    let digits_end = label
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(index, _)| index)
        .unwrap_or(label.len());
    let Ok(base) = label[..digits_end].parse::<u64>() else {
        return 0.0;
    };

    let offset = label[digits_end..]
        .chars()
        .next()
        .filter(|ch| ch.is_ascii_alphabetic())
        .map(|ch| f64::from(ch.to_ascii_uppercase() as u8 - b'A' + 1) / 100.0)
        .unwrap_or(0.0);

    base as f64 + offset
}
