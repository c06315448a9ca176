use std::collections::HashSet;

use crate::acts::{ActConfig, GroupOrdering};
use crate::error::StructuralViolation;
use crate::model::{Document, GroupKind};
use crate::structure::clause_tree::max_clause_depth;
use crate::tables::{MAX_CLAUSE_DEPTH, constitution_part_index, roman_code_index};

#[derive(Debug, Clone, Copy)]
pub struct StructureBounds {
    pub min_sections: Option<usize>,
    pub max_sections: Option<usize>,
    pub ordering: GroupOrdering,
}

impl From<&ActConfig> for StructureBounds {
    fn from(act: &ActConfig) -> Self {
        Self {
            min_sections: act.expected_min_sections,
            max_sections: act.expected_max_sections,
            ordering: act.group_ordering,
        }
    }
}

fn group_index(ordering: GroupOrdering, code: &str) -> Option<usize> {
    match ordering {
        GroupOrdering::ConstitutionParts => constitution_part_index(code),
        GroupOrdering::Roman => roman_code_index(code),
        GroupOrdering::Unchecked => Some(0),
    }
}

/// Checks the section count, number uniqueness, group ordering and clause
/// depth of a parsed document. The first violation found is returned.
pub fn validate_document(
    document: &Document,
    bounds: &StructureBounds,
) -> Result<(), StructuralViolation> {
    let count = document.sections.len();
    let below = bounds.min_sections.is_some_and(|min| count < min);
    let above = bounds.max_sections.is_some_and(|max| count > max);
    if below || above {
        return Err(StructuralViolation::SectionCountOutOfBounds {
            act_id: document.act_id.clone(),
            count,
            min: bound_label(bounds.min_sections),
            max: bound_label(bounds.max_sections),
        });
    }

    let mut seen = HashSet::new();
    for section in &document.sections {
        if !seen.insert(section.number.as_str()) {
            return Err(StructuralViolation::DuplicateSection {
                act_id: document.act_id.clone(),
                section: section.number.clone(),
            });
        }
    }

    validate_group_order(document, bounds.ordering)?;

    for section in &document.sections {
        let depth = max_clause_depth(&section.clauses);
        if depth > MAX_CLAUSE_DEPTH {
            return Err(StructuralViolation::ClauseDepthExceeded {
                act_id: document.act_id.clone(),
                section: section.number.clone(),
                depth,
                max: MAX_CLAUSE_DEPTH,
            });
        }
    }

    Ok(())
}

/// Group codes declared by successive sections must never move back to an
/// earlier position in the canonical ordering.
pub fn validate_group_order(
    document: &Document,
    ordering: GroupOrdering,
) -> Result<(), StructuralViolation> {
    if ordering == GroupOrdering::Unchecked {
        return Ok(());
    }

    let mut last: Option<(usize, &str)> = None;
    for section in &document.sections {
        let Some(code) = section.group_code() else {
            continue;
        };
        let keyword = section
            .chapter
            .as_ref()
            .map(|chapter| chapter.kind)
            .unwrap_or(GroupKind::Part)
            .keyword()
            .to_ascii_lowercase();

        let Some(index) = group_index(ordering, code) else {
            return Err(StructuralViolation::UnknownGroupCode {
                act_id: document.act_id.clone(),
                section: section.number.clone(),
                keyword,
                code: code.to_string(),
            });
        };

        if let Some((previous_index, previous_code)) = last {
            if index < previous_index {
                return Err(StructuralViolation::GroupOrderRegression {
                    act_id: document.act_id.clone(),
                    section: section.number.clone(),
                    keyword,
                    code: code.to_string(),
                    previous: previous_code.to_string(),
                });
            }
        }
        last = Some((index, code));
    }

    Ok(())
}

fn bound_label(bound: Option<usize>) -> String {
    bound
        .map(|value| value.to_string())
        .unwrap_or_else(|| "unbounded".to_string())
}
