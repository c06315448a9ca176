//! Builds the nested clause tree of a section body.
//!
//! Nodes live in an arena addressed by index while the tree is open; the
//! stack holds `(level, node index)` pairs. Finished trees are converted to
//! owned [`Clause`] values.

use anyhow::{Context, Result};
use regex::Regex;

use crate::error::StructuralViolation;
use crate::model::{Clause, ClauseKind};
use crate::tables::{MAX_CLAUSE_DEPTH, clause_level};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseTree {
    pub intro: Option<String>,
    pub clauses: Vec<Clause>,
}

#[derive(Debug)]
struct ClauseNode {
    kind: ClauseKind,
    label: String,
    text_parts: Vec<String>,
    children: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct OpenClause {
    level: usize,
    node: usize,
    depth: usize,
}

#[derive(Debug)]
pub struct ClauseTreeBuilder {
    patterns: Vec<(ClauseKind, Regex)>,
    inline_amendment: Regex,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClauseOptions {
    pub strip_amendment_markers: bool,
}

impl ClauseTreeBuilder {
    pub fn new() -> Result<Self> {
        // Priority order matters: "(i)" is roman before it is lower-alpha.
        let patterns = vec![
            (
                ClauseKind::Numeric,
                Regex::new(r"^\((\d+[A-Z]?)\)\s*(.*)$")
                    .context("failed to compile numeric clause regex")?,
            ),
            (
                ClauseKind::Roman,
                Regex::new(r"^\((?i:([ivxl]+))\)\s*(.*)$")
                    .context("failed to compile roman clause regex")?,
            ),
            (
                ClauseKind::AlphaLower,
                Regex::new(r"^\(([a-z])\)\s*(.*)$")
                    .context("failed to compile lower-alpha clause regex")?,
            ),
            (
                ClauseKind::AlphaUpper,
                Regex::new(r"^\(([A-Z])\)\s*(.*)$")
                    .context("failed to compile upper-alpha clause regex")?,
            ),
        ];

        Ok(Self {
            patterns,
            inline_amendment: Regex::new(r"^\d+\[(.*)$")
                .context("failed to compile inline amendment marker regex")?,
        })
    }

    pub fn match_marker<'a>(&self, line: &'a str) -> Option<(ClauseKind, String, &'a str)> {
        for (kind, pattern) in &self.patterns {
            let Some(captures) = pattern.captures(line) else {
                continue;
            };
            let label = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let remainder = captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            let label = if *kind == ClauseKind::Roman {
                label.to_ascii_lowercase()
            } else {
                label.to_string()
            };
            return Some((*kind, label, remainder));
        }

        None
    }

    pub fn build(
        &self,
        body: &str,
        options: ClauseOptions,
        act_id: &str,
        section: &str,
    ) -> Result<ClauseTree, StructuralViolation> {
        let mut arena = Vec::<ClauseNode>::new();
        let mut roots = Vec::<usize>::new();
        let mut intro_parts = Vec::<String>::new();
        let mut stack = Vec::<OpenClause>::new();

        for raw_line in body.lines() {
            let stripped = raw_line.trim();
            if stripped.is_empty() {
                push_text(&mut arena, &stack, &mut intro_parts, String::new());
                continue;
            }

            let prepared = if options.strip_amendment_markers {
                clean_bracket_artifacts(&self.strip_inline_amendment(stripped))
            } else {
                stripped.to_string()
            };

            let Some((kind, label, remainder)) = self.match_marker(&prepared) else {
                push_text(&mut arena, &stack, &mut intro_parts, prepared);
                continue;
            };

            let mut level = clause_level(kind);
            match stack.last() {
                None if level > 1 => level = 1,
                Some(top) if arena[top.node].kind == kind && top.level < level => {
                    level = top.level;
                }
                _ => {}
            }

            while stack.last().is_some_and(|top| top.level >= level) {
                stack.pop();
            }

            let depth = stack.last().map(|top| top.depth + 1).unwrap_or(1);
            if depth > MAX_CLAUSE_DEPTH {
                return Err(StructuralViolation::ClauseDepthExceeded {
                    act_id: act_id.to_string(),
                    section: section.to_string(),
                    depth,
                    max: MAX_CLAUSE_DEPTH,
                });
            }

            let index = arena.len();
            arena.push(ClauseNode {
                kind,
                label,
                text_parts: if remainder.is_empty() {
                    Vec::new()
                } else {
                    vec![remainder.to_string()]
                },
                children: Vec::new(),
            });

            match stack.last() {
                Some(parent) => arena[parent.node].children.push(index),
                None => roots.push(index),
            }
            stack.push(OpenClause {
                level,
                node: index,
                depth,
            });
        }

        let intro = collapse_text(&intro_parts);
        let clauses = roots
            .into_iter()
            .map(|root| finish_node(&arena, root))
            .collect();

        Ok(ClauseTree { intro, clauses })
    }

    fn strip_inline_amendment(&self, line: &str) -> String {
        let Some(captures) = self.inline_amendment.captures(line) else {
            return line.to_string();
        };
        let remainder = captures.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        remainder
            .strip_suffix(']')
            .map(str::trim_end)
            .unwrap_or(remainder)
            .to_string()
    }
}

fn push_text(
    arena: &mut [ClauseNode],
    stack: &[OpenClause],
    intro_parts: &mut Vec<String>,
    line: String,
) {
    match stack.last() {
        Some(top) => arena[top.node].text_parts.push(line),
        None => intro_parts.push(line),
    }
}

fn finish_node(arena: &[ClauseNode], index: usize) -> Clause {
    let node = &arena[index];
    Clause {
        kind: node.kind,
        label: node.label.clone(),
        text: collapse_text(&node.text_parts),
        children: node
            .children
            .iter()
            .map(|child| finish_node(arena, *child))
            .collect(),
    }
}

fn collapse_text(parts: &[String]) -> Option<String> {
    let joined = parts.join("\n");
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Removes stray amendment brackets left behind by extraction.
pub fn clean_bracket_artifacts(line: &str) -> String {
    let stripped = line.trim();
    if stripped == "]" || stripped == "[" {
        return String::new();
    }

    let mut current = line;
    while let Some(rest) = current.strip_prefix(']') {
        current = rest.trim_start();
    }
    while !current.contains(']') {
        let Some(rest) = current.strip_prefix('[') else {
            break;
        };
        current = rest.trim_start();
    }
    if current.ends_with(']') && !current.contains('[') {
        current = current[..current.len() - 1].trim_end();
    }
    if current.len() >= 2 && current.starts_with('[') && current.ends_with(']') {
        current = current[1..current.len() - 1].trim();
    }

    current.to_string()
}

/// Maximum depth across a forest of clauses; an empty forest has depth 0.
pub fn max_clause_depth(clauses: &[Clause]) -> usize {
    clauses.iter().map(Clause::depth).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(body: &str) -> ClauseTree {
        ClauseTreeBuilder::new()
            .unwrap()
            .build(body, ClauseOptions::default(), "TEST", "1")
            .unwrap()
    }

    // Markers are recognised at line starts; extracted sources put one
    // clause per line.
    #[test]
    fn nests_alpha_clauses_under_numeric_clauses() {
        let tree = build("(1) First clause\n(a) sub one\n(b) sub two\n(2) Second clause");

        assert!(tree.intro.is_none());
        assert_eq!(tree.clauses.len(), 2);
        let first = &tree.clauses[0];
        assert_eq!(first.kind, ClauseKind::Numeric);
        assert_eq!(first.label, "1");
        assert_eq!(first.text.as_deref(), Some("First clause"));
        assert_eq!(first.children.len(), 2);
        assert_eq!(first.children[0].kind, ClauseKind::AlphaLower);
        assert_eq!(first.children[0].label, "a");
        assert_eq!(first.children[1].text.as_deref(), Some("sub two"));
        assert!(tree.clauses[1].children.is_empty());
        assert_eq!(tree.clauses[1].text.as_deref(), Some("Second clause"));
    }

    #[test]
    fn leaf_clauses_serialize_without_children_field() {
        let tree = build("(1) Only clause");
        let value = serde_json::to_value(&tree.clauses[0]).unwrap();
        assert!(value.get("children").is_none());
        assert_eq!(value["type"], "numeric");
    }

    #[test]
    fn lines_before_first_marker_become_intro() {
        let tree = build("Whoever does any of the following,\nnamely:--\n(a) first act;\n(b) second act");
        assert_eq!(
            tree.intro.as_deref(),
            Some("Whoever does any of the following,\nnamely:--")
        );
        assert_eq!(tree.clauses.len(), 2);
        assert_eq!(tree.clauses[0].kind, ClauseKind::AlphaLower);
        assert_eq!(tree.clauses[1].label, "b");
    }

    #[test]
    fn roman_markers_nest_below_alpha_and_lowercase_labels() {
        let tree = build("(1) Clause\n(a) item\n(I) first\n(ii) second\n(b) next item");
        let alpha = &tree.clauses[0].children[0];
        assert_eq!(alpha.children.len(), 2);
        assert_eq!(alpha.children[0].kind, ClauseKind::Roman);
        assert_eq!(alpha.children[0].label, "i");
        assert_eq!(alpha.children[1].label, "ii");
        assert_eq!(tree.clauses[0].children[1].label, "b");
    }

    #[test]
    fn same_type_marker_is_coerced_to_the_open_level() {
        // A roman marker forced to the top level stays a sibling of the
        // next roman marker instead of nesting under it.
        let tree = build("(i) first\n(ii) second\n(iii) third");
        assert_eq!(tree.clauses.len(), 3);
        assert!(tree.clauses.iter().all(|clause| clause.children.is_empty()));
        assert_eq!(tree.clauses[2].label, "iii");
    }

    #[test]
    fn continuation_lines_stay_with_their_clause() {
        let tree = build("(1) The State shall\nnot deny\n\n(2) Nothing");
        assert_eq!(tree.clauses[0].text.as_deref(), Some("The State shall\nnot deny"));
    }

    #[test]
    fn amendment_markers_and_brackets_are_stripped_when_enabled() {
        let builder = ClauseTreeBuilder::new().unwrap();
        let options = ClauseOptions {
            strip_amendment_markers: true,
        };
        let tree = builder
            .build("1[(a) inserted clause]\n]\n(b) plain", options, "CONST-1950", "15")
            .unwrap();
        assert_eq!(tree.clauses.len(), 2);
        assert_eq!(tree.clauses[0].text.as_deref(), Some("inserted clause"));
        assert_eq!(tree.clauses[1].label, "b");
    }

    #[test]
    fn clean_bracket_artifacts_handles_common_remnants() {
        assert_eq!(clean_bracket_artifacts("]"), "");
        assert_eq!(clean_bracket_artifacts("] text"), "text");
        assert_eq!(clean_bracket_artifacts("[open text"), "open text");
        assert_eq!(clean_bracket_artifacts("closing text]"), "closing text");
        assert_eq!(clean_bracket_artifacts("[whole]"), "whole");
        assert_eq!(clean_bracket_artifacts("keep [inner] text"), "keep [inner] text");
    }

    #[test]
    fn tree_depth_never_exceeds_marker_levels() {
        let tree = build("(1) a\n(a) b\n(i) c\n(A) d\n(ii) e");
        assert!(max_clause_depth(&tree.clauses) <= MAX_CLAUSE_DEPTH);
        assert_eq!(max_clause_depth(&tree.clauses), 3);
    }
}
