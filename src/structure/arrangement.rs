//! Compares the parsed order of sections with an authoritative list.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::error::PipelineError;
use crate::model::{ArrangementDiff, Document, OrderMismatch};

pub const LENGTH_MISMATCH: &str = "<length mismatch>";

/// One entry per non-blank line; lines starting with `#` are comments.
pub fn parse_canonical_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn load_canonical_list(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(PipelineError::MissingSource {
            path: path.to_path_buf(),
        }
        .into());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read arrangement list {}", path.display()))?;
    let entries = parse_canonical_list(&text);
    if entries.is_empty() {
        bail!("arrangement list is empty: {}", path.display());
    }

    Ok(entries)
}

pub fn parsed_order(document: &Document) -> Vec<String> {
    document
        .sections
        .iter()
        .map(|section| section.number.trim())
        .filter(|number| !number.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn compare_arrangements(canonical: &[String], parsed: &[String]) -> ArrangementDiff {
    let canonical_set: HashSet<&str> = canonical.iter().map(String::as_str).collect();
    let parsed_set: HashSet<&str> = parsed.iter().map(String::as_str).collect();

    let missing = canonical
        .iter()
        .filter(|entry| !parsed_set.contains(entry.as_str()))
        .cloned()
        .collect();
    let extra = parsed
        .iter()
        .filter(|entry| !canonical_set.contains(entry.as_str()))
        .cloned()
        .collect();

    let common_canonical: Vec<&String> = canonical
        .iter()
        .filter(|entry| parsed_set.contains(entry.as_str()))
        .collect();
    let common_parsed: Vec<&String> = parsed
        .iter()
        .filter(|entry| canonical_set.contains(entry.as_str()))
        .collect();

    let mut order_mismatches: Vec<OrderMismatch> = common_canonical
        .iter()
        .zip(&common_parsed)
        .enumerate()
        .filter(|(_, (expected, found))| expected != found)
        .map(|(position, (expected, found))| OrderMismatch {
            position,
            expected: (*expected).clone(),
            found: (*found).clone(),
        })
        .collect();

    // Duplicated entries make the common subsequences differ in length.
    if common_canonical.len() != common_parsed.len() {
        let shorter = common_canonical.len().min(common_parsed.len());
        let expected = if shorter == 0 {
            String::new()
        } else {
            common_canonical[shorter - 1].clone()
        };
        order_mismatches.push(OrderMismatch {
            position: shorter,
            expected,
            found: LENGTH_MISMATCH.to_string(),
        });
    }

    ArrangementDiff {
        missing,
        extra,
        order_mismatches,
    }
}

/// Plain-text snapshot of the parsed order, one number per line.
pub fn render_snapshot(parsed: &[String]) -> String {
    let mut snapshot = parsed.join("\n");
    snapshot.push('\n');
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn missing_entry_without_order_mismatch() {
        let diff = compare_arrangements(&list(&["1", "2", "3"]), &list(&["1", "3"]));
        assert_eq!(diff.missing, list(&["2"]));
        assert!(diff.extra.is_empty());
        assert!(diff.order_mismatches.is_empty());
        assert!(!diff.is_clean());
    }

    #[test]
    fn swapped_entries_report_positional_divergence() {
        let diff = compare_arrangements(&list(&["1", "2", "3"]), &list(&["1", "3", "2"]));
        assert!(diff.missing.is_empty());
        assert!(diff.extra.is_empty());
        assert_eq!(
            diff.order_mismatches[0],
            OrderMismatch {
                position: 1,
                expected: "2".to_string(),
                found: "3".to_string(),
            }
        );
        assert_eq!(diff.order_mismatches.len(), 2);
    }

    #[test]
    fn duplicate_parsed_entry_adds_trailing_length_mismatch() {
        let diff = compare_arrangements(&list(&["1", "2"]), &list(&["1", "2", "2"]));
        assert!(diff.extra.is_empty());
        let last = diff.order_mismatches.last().unwrap();
        assert_eq!(last.position, 2);
        assert_eq!(last.expected, "2");
        assert_eq!(last.found, LENGTH_MISMATCH);
    }

    #[test]
    fn extra_entries_are_listed_in_parsed_order() {
        let diff = compare_arrangements(&list(&["1", "2"]), &list(&["1", "1A", "2", "0"]));
        assert_eq!(diff.extra, list(&["1A", "0"]));
        assert!(diff.order_mismatches.is_empty());
    }

    #[test]
    fn identical_lists_are_clean() {
        let entries = list(&["1", "2", "2A", "3"]);
        assert!(compare_arrangements(&entries, &entries).is_clean());
    }

    #[test]
    fn canonical_list_ignores_comments_and_blanks() {
        let parsed = parse_canonical_list("# Part I\n1\n\n  2 \n# Part II\n5\n");
        assert_eq!(parsed, list(&["1", "2", "5"]));
    }

    #[test]
    fn missing_canonical_file_is_a_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_canonical_list(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingSource { .. })
        ));
    }

    #[test]
    fn comment_only_canonical_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arrangement.txt");
        fs::write(&path, "# nothing here\n\n").unwrap();
        assert!(load_canonical_list(&path).is_err());
    }
}
