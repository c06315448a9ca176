//! Cross-reference extraction over the text fields of a section.
//!
//! Explicit mentions ("Article 21", "Part III", "Second Schedule",
//! "Part A and Part B of the First Schedule") become [`Reference`]s.
//! Mentions of "article", "Part" or "schedule" left uncovered by any match
//! are reported as [`QaFlag`]s for manual review.

use std::collections::HashSet;

use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{
    Clause, Document, GroupKind, MentionIssue, QaFlag, Reference, ReferenceKind, Section,
};
use crate::tables::{SCHEDULE_ORDINAL_ALTERNATION, schedule_token_for};
use crate::util::collapse_whitespace;

const SNIPPET_WINDOW_CHARS: usize = 60;

/// Section-level context needed to resolve "this article" / "this Part".
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionScope<'a> {
    pub section_number: &'a str,
    pub part_code: Option<&'a str>,
}

impl<'a> SectionScope<'a> {
    pub fn for_section(section: &'a Section) -> Self {
        let part_code = section
            .chapter
            .as_ref()
            .filter(|chapter| chapter.kind == GroupKind::Part)
            .map(|chapter| chapter.code.trim())
            .filter(|code| !code.is_empty());

        Self {
            section_number: section.number.as_str(),
            part_code,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SegmentMatches {
    pub references: Vec<Reference>,
    pub flags: Vec<QaFlag>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferenceReport {
    pub references_detected: usize,
    pub sections_changed: usize,
    pub flags: Vec<QaFlag>,
}

/// Mention scan whose negative lookahead is checked by hand on the text that
/// follows each hit.
#[derive(Debug)]
struct MentionScan {
    word: Regex,
    resolved_by: Regex,
    issue: MentionIssue,
}

#[derive(Debug)]
pub struct ReferenceExtractor {
    article: Regex,
    part: Regex,
    schedule_after: Regex,
    schedule_before: Regex,
    schedule_parts: Regex,
    schedule_part_letter: Regex,
    this_part: Regex,
    this_article: Regex,
    mentions: Vec<MentionScan>,
}

impl ReferenceExtractor {
    pub fn new() -> Result<Self> {
        let ordinals = SCHEDULE_ORDINAL_ALTERNATION;
        Ok(Self {
            article: Regex::new(r"(?i)\b(?:art(?:icle)?\.?\s+)(\d+[A-Z]?)")
                .context("failed to compile article reference regex")?,
            part: Regex::new(r"\b(?i:part)\s+([IVXLC]+A?)\b")
                .context("failed to compile part reference regex")?,
            schedule_after: Regex::new(&format!(
                r"(?i)\b(?:schedule\b|sch\.)\s+({ordinals})\b"
            ))
            .context("failed to compile schedule reference regex")?,
            schedule_before: Regex::new(&format!(
                r"(?i)\b({ordinals})\s+(?:schedule\b|sch\.)"
            ))
            .context("failed to compile schedule reference regex")?,
            schedule_parts: Regex::new(&format!(
                r"(?i)(part\s+[A-Z](?:\s*(?:,|and|or)\s+part\s+[A-Z])*)\s+of\s+the\s+({ordinals})\s+(?:schedule\b|sch\.)"
            ))
            .context("failed to compile schedule part regex")?,
            schedule_part_letter: Regex::new(r"(?i)part\s+([A-Z])")
                .context("failed to compile schedule part letter regex")?,
            this_part: Regex::new(r"\b[Tt]his\s+Part\b")
                .context("failed to compile self part regex")?,
            this_article: Regex::new(r"(?i)\bthis\s+article\b")
                .context("failed to compile self article regex")?,
            mentions: vec![
                MentionScan {
                    word: Regex::new(r"(?i)\barticle\b")
                        .context("failed to compile article mention regex")?,
                    resolved_by: Regex::new(r"^\s+\d")
                        .context("failed to compile article mention follow regex")?,
                    issue: MentionIssue::ArticleMentionWithoutNumber,
                },
                MentionScan {
                    word: Regex::new(r"\bPart\b").context("failed to compile part mention regex")?,
                    resolved_by: Regex::new(r"^\s+[IVXLC]")
                        .context("failed to compile part mention follow regex")?,
                    issue: MentionIssue::PartMentionWithoutCode,
                },
                MentionScan {
                    word: Regex::new(r"(?i)\bschedule\b")
                        .context("failed to compile schedule mention regex")?,
                    resolved_by: Regex::new(&format!(r"(?i)^\s+(?:{ordinals})"))
                        .context("failed to compile schedule mention follow regex")?,
                    issue: MentionIssue::ScheduleMentionWithoutName,
                },
            ],
        })
    }

    /// Scans a single text field. References are returned in detection
    /// order and may repeat; de-duplication happens per section.
    pub fn extract_from_segment(
        &self,
        text: &str,
        field: &str,
        scope: SectionScope<'_>,
    ) -> SegmentMatches {
        let mut matches = SegmentMatches::default();
        if text.trim().is_empty() {
            return matches;
        }

        let mut spans = Vec::<(usize, usize)>::new();
        let add = |kind: ReferenceKind,
                   target: String,
                   start: usize,
                   end: usize,
                   spans: &mut Vec<(usize, usize)>,
                   references: &mut Vec<Reference>| {
            references.push(Reference {
                kind,
                target,
                field: field.to_string(),
                snippet: build_snippet(text, start, end),
            });
            spans.push((start, end));
        };

        // Compound schedule phrases first so their "Part A" letters are not
        // also read as constitutional parts.
        let mut schedule_part_refs = Vec::new();
        let mut schedule_part_spans = Vec::new();
        for captures in self.schedule_parts.captures_iter(text) {
            let (Some(whole), Some(letters), Some(ordinal)) =
                (captures.get(0), captures.get(1), captures.get(2))
            else {
                continue;
            };
            let Some(token) = schedule_token_for(ordinal.as_str()) else {
                continue;
            };
            let snippet = build_snippet(text, whole.start(), whole.end());
            schedule_part_spans.push((whole.start(), whole.end()));
            for letter in self
                .schedule_part_letter
                .captures_iter(letters.as_str())
                .filter_map(|c| c.get(1))
            {
                schedule_part_refs.push(Reference {
                    kind: ReferenceKind::Schedule,
                    target: format!("{token}_PART_{}", letter.as_str().to_ascii_uppercase()),
                    field: field.to_string(),
                    snippet: snippet.clone(),
                });
            }
        }

        for captures in self.article.captures_iter(text) {
            let (Some(whole), Some(number)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            add(
                ReferenceKind::Article,
                number.as_str().to_ascii_uppercase(),
                whole.start(),
                whole.end(),
                &mut spans,
                &mut matches.references,
            );
        }

        for captures in self.part.captures_iter(text) {
            let (Some(whole), Some(code)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if overlaps(&schedule_part_spans, whole.start(), whole.end()) {
                continue;
            }
            add(
                ReferenceKind::Part,
                code.as_str().to_string(),
                whole.start(),
                whole.end(),
                &mut spans,
                &mut matches.references,
            );
        }

        for regex in [&self.schedule_after, &self.schedule_before] {
            for captures in regex.captures_iter(text) {
                let (Some(whole), Some(ordinal)) = (captures.get(0), captures.get(1)) else {
                    continue;
                };
                let Some(token) = schedule_token_for(ordinal.as_str()) else {
                    continue;
                };
                add(
                    ReferenceKind::Schedule,
                    token.to_string(),
                    whole.start(),
                    whole.end(),
                    &mut spans,
                    &mut matches.references,
                );
            }
        }

        matches.references.extend(schedule_part_refs);
        spans.extend(schedule_part_spans);

        if let Some(part_code) = scope.part_code {
            for found in self.this_part.find_iter(text) {
                add(
                    ReferenceKind::Part,
                    part_code.to_ascii_uppercase(),
                    found.start(),
                    found.end(),
                    &mut spans,
                    &mut matches.references,
                );
            }
        }

        if !scope.section_number.is_empty() {
            for found in self.this_article.find_iter(text) {
                add(
                    ReferenceKind::Article,
                    scope.section_number.to_ascii_uppercase(),
                    found.start(),
                    found.end(),
                    &mut spans,
                    &mut matches.references,
                );
            }
        }

        for scan in &self.mentions {
            for found in scan.word.find_iter(text) {
                if scan.resolved_by.is_match(&text[found.end()..]) {
                    continue;
                }
                if overlaps(&spans, found.start(), found.end()) {
                    continue;
                }
                matches.flags.push(QaFlag {
                    section_number: scope.section_number.to_string(),
                    field: field.to_string(),
                    issue: scan.issue,
                    context: build_snippet(text, found.start(), found.end()),
                });
            }
        }

        matches
    }

    /// All references of a section, de-duplicated by `(type, target)` in
    /// first-seen order, plus every advisory flag raised along the way.
    pub fn collect_section_references(&self, section: &Section) -> SegmentMatches {
        let scope = SectionScope::for_section(section);
        let mut seen = HashSet::<(ReferenceKind, String)>::new();
        let mut collected = SegmentMatches::default();

        for (field, text) in section_segments(section) {
            let found = self.extract_from_segment(text, &field, scope);
            for reference in found.references {
                if seen.insert((reference.kind, reference.target.clone())) {
                    collected.references.push(reference);
                }
            }
            collected.flags.extend(found.flags);
        }

        collected
    }

    /// Replaces the `references` of every section in place.
    pub fn annotate_references(&self, document: &mut Document) -> ReferenceReport {
        let mut report = ReferenceReport::default();

        for section in &mut document.sections {
            let found = self.collect_section_references(section);
            report.references_detected += found.references.len();
            report.flags.extend(found.flags);
            if section.references != found.references {
                section.references = found.references;
                report.sections_changed += 1;
            }
        }

        report
    }
}

/// Text fields scanned for references: heading, intro and every clause text
/// (`clauses[0]`, `clauses[0].clauses[2]`, ...).
pub fn section_segments(section: &Section) -> Vec<(String, &str)> {
    let mut segments = Vec::new();
    if !section.heading.trim().is_empty() {
        segments.push(("heading".to_string(), section.heading.as_str()));
    }
    if let Some(intro) = section.intro.as_deref().filter(|text| !text.trim().is_empty()) {
        segments.push(("intro".to_string(), intro));
    }
    walk_clauses(&section.clauses, "", &mut segments);
    segments
}

fn walk_clauses<'a>(clauses: &'a [Clause], prefix: &str, segments: &mut Vec<(String, &'a str)>) {
    for (index, clause) in clauses.iter().enumerate() {
        let field = format!("{prefix}clauses[{index}]");
        if let Some(text) = clause.text.as_deref().filter(|text| !text.trim().is_empty()) {
            segments.push((field.clone(), text));
        }
        if !clause.children.is_empty() {
            walk_clauses(&clause.children, &format!("{field}."), segments);
        }
    }
}

fn overlaps(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    spans
        .iter()
        .any(|(span_start, span_end)| !(end <= *span_start || start >= *span_end))
}

/// Up to sixty characters either side of the match, whitespace collapsed.
pub fn build_snippet(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(SNIPPET_WINDOW_CHARS)
        .last()
        .map(|(index, _)| index)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(SNIPPET_WINDOW_CHARS)
        .map(|(index, _)| end + index)
        .unwrap_or(text.len());

    collapse_whitespace(&text[from..to])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chapter, ClauseKind};

    fn extractor() -> ReferenceExtractor {
        ReferenceExtractor::new().unwrap()
    }

    fn targets(matches: &SegmentMatches) -> Vec<(ReferenceKind, String)> {
        matches
            .references
            .iter()
            .map(|reference| (reference.kind, reference.target.clone()))
            .collect()
    }

    #[test]
    fn explicit_article_mention_yields_one_reference() {
        let found = extractor().extract_from_segment(
            "subject to Article 21 of the Constitution",
            "intro",
            SectionScope::default(),
        );
        assert_eq!(targets(&found), vec![(ReferenceKind::Article, "21".to_string())]);
        assert_eq!(found.references[0].field, "intro");
        assert!(found.flags.is_empty());
    }

    #[test]
    fn this_article_resolves_to_own_number() {
        let scope = SectionScope {
            section_number: "14",
            part_code: Some("III"),
        };
        let found = extractor().extract_from_segment("violates this article", "clauses[0]", scope);
        assert_eq!(targets(&found), vec![(ReferenceKind::Article, "14".to_string())]);
        assert!(found.flags.is_empty());
    }

    #[test]
    fn this_part_resolves_to_own_part_code() {
        let scope = SectionScope {
            section_number: "13",
            part_code: Some("III"),
        };
        let found = extractor().extract_from_segment(
            "rights conferred by this Part",
            "clauses[1]",
            scope,
        );
        assert_eq!(targets(&found), vec![(ReferenceKind::Part, "III".to_string())]);
    }

    #[test]
    fn abbreviated_and_lettered_articles_are_uppercased() {
        let found = extractor().extract_from_segment(
            "under art. 31a or Article 300A",
            "intro",
            SectionScope::default(),
        );
        assert_eq!(
            targets(&found),
            vec![
                (ReferenceKind::Article, "31A".to_string()),
                (ReferenceKind::Article, "300A".to_string()),
            ]
        );
    }

    #[test]
    fn schedules_are_detected_before_and_after_the_ordinal() {
        let found = extractor().extract_from_segment(
            "specified in the Seventh Schedule and in Schedule First",
            "intro",
            SectionScope::default(),
        );
        assert_eq!(
            targets(&found),
            vec![
                (ReferenceKind::Schedule, "FIRST".to_string()),
                (ReferenceKind::Schedule, "SEVENTH".to_string()),
            ]
        );
    }

    #[test]
    fn compound_schedule_parts_expand_per_letter() {
        let found = extractor().extract_from_segment(
            "the States specified in Part A and Part B of the First Schedule",
            "intro",
            SectionScope::default(),
        );
        let found_targets = targets(&found);
        assert!(found_targets.contains(&(ReferenceKind::Schedule, "FIRST".to_string())));
        assert!(found_targets.contains(&(ReferenceKind::Schedule, "FIRST_PART_A".to_string())));
        assert!(found_targets.contains(&(ReferenceKind::Schedule, "FIRST_PART_B".to_string())));
        assert!(!found_targets.iter().any(|(kind, _)| *kind == ReferenceKind::Part));
        assert!(found.flags.is_empty());
    }

    #[test]
    fn part_codes_must_be_complete_roman_tokens() {
        let found = extractor().extract_from_segment(
            "in Part XIVA and in part in respect of",
            "intro",
            SectionScope::default(),
        );
        assert_eq!(targets(&found), vec![(ReferenceKind::Part, "XIVA".to_string())]);
    }

    #[test]
    fn unresolved_mentions_are_flagged_not_referenced() {
        let found = extractor().extract_from_segment(
            "the said article, any Part thereof and the schedule annexed",
            "heading",
            SectionScope {
                section_number: "5",
                part_code: None,
            },
        );
        assert!(found.references.is_empty());
        let issues: Vec<MentionIssue> = found.flags.iter().map(|flag| flag.issue).collect();
        assert_eq!(
            issues,
            vec![
                MentionIssue::ArticleMentionWithoutNumber,
                MentionIssue::PartMentionWithoutCode,
                MentionIssue::ScheduleMentionWithoutName,
            ]
        );
        assert!(found.flags.iter().all(|flag| flag.section_number == "5"));
        assert!(found.flags.iter().all(|flag| flag.field == "heading"));
    }

    #[test]
    fn lowercase_part_is_not_an_ambiguous_mention() {
        let found = extractor().extract_from_segment(
            "in whole or in part",
            "intro",
            SectionScope::default(),
        );
        assert!(found.flags.is_empty());
    }

    #[test]
    fn snippet_is_bounded_and_collapsed() {
        let prefix = "x".repeat(100);
        let text = format!("{prefix}  Article\n 21  {}", "y".repeat(100));
        let found = extractor().extract_from_segment(&text, "intro", SectionScope::default());
        let snippet = &found.references[0].snippet;
        assert!(snippet.contains("Article 21"));
        assert_eq!(snippet.chars().filter(|ch| *ch == 'x').count(), 58);
    }

    #[test]
    fn snippet_window_respects_multibyte_boundaries() {
        let text = format!("{} Article 5 {}", "अनुच्छेद".repeat(20), "à".repeat(80));
        let found = extractor().extract_from_segment(&text, "intro", SectionScope::default());
        assert_eq!(found.references.len(), 1);
        assert!(found.references[0].snippet.contains("Article 5"));
    }

    #[test]
    fn section_references_are_deduplicated_in_first_seen_order() {
        let mut section = Section::new("19", "Protection of certain rights");
        section.chapter = Some(Chapter {
            kind: GroupKind::Part,
            code: "III".to_string(),
            title: "FUNDAMENTAL RIGHTS".to_string(),
        });
        section.intro = Some("Subject to article 21 and this Part".to_string());
        section.clauses = vec![Clause {
            kind: ClauseKind::Numeric,
            label: "1".to_string(),
            text: Some("as in Article 21".to_string()),
            children: vec![Clause {
                kind: ClauseKind::AlphaLower,
                label: "a".to_string(),
                text: Some("see Article 32".to_string()),
                children: Vec::new(),
            }],
        }];

        let found = extractor().collect_section_references(&section);
        assert_eq!(
            targets(&found),
            vec![
                (ReferenceKind::Article, "21".to_string()),
                (ReferenceKind::Part, "III".to_string()),
                (ReferenceKind::Article, "32".to_string()),
            ]
        );
        assert_eq!(found.references[0].field, "intro");
        assert_eq!(found.references[2].field, "clauses[0].clauses[0]");
    }

    #[test]
    fn annotate_counts_changed_sections_only_once() {
        let mut section = Section::new("14", "Equality before law");
        section.intro = Some("Nothing in this article shall".to_string());
        let mut document = Document {
            act_id: "CONST-1950".to_string(),
            language: "en".to_string(),
            sections: vec![section, Section::new("15", "Prohibition of discrimination")],
            chapters: Vec::new(),
            document_notes: Vec::new(),
        };

        let extractor = extractor();
        let first = extractor.annotate_references(&mut document);
        assert_eq!(first.references_detected, 1);
        assert_eq!(first.sections_changed, 1);
        assert_eq!(document.sections[0].references[0].target, "14");

        let second = extractor.annotate_references(&mut document);
        assert_eq!(second.references_detected, 1);
        assert_eq!(second.sections_changed, 0);
    }
}
