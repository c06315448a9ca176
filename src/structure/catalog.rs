//! Reference catalog: forward lists per section and a reverse index from
//! each target back to the sections that cite it.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Document, ReferenceKind};
use crate::structure::segmenter::section_sort_value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTargets {
    pub section_number: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub article: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub part: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedule: Vec<String>,
}

impl SectionTargets {
    fn bucket_mut(&mut self, kind: ReferenceKind) -> &mut Vec<String> {
        match kind {
            ReferenceKind::Article => &mut self.article,
            ReferenceKind::Part => &mut self.part,
            ReferenceKind::Schedule => &mut self.schedule,
        }
    }
}

/// type -> target -> referencing section numbers.
pub type ReverseIndex = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActCatalog {
    pub act_id: String,
    pub sections: Vec<SectionTargets>,
    pub reverse_index: ReverseIndex,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCatalog {
    pub acts: Vec<ActCatalog>,
}

impl ReferenceCatalog {
    pub fn total_targets(&self) -> usize {
        self.acts
            .iter()
            .flat_map(|act| act.reverse_index.values())
            .map(BTreeMap::len)
            .sum()
    }
}

pub fn build_act_catalog(document: &Document) -> ActCatalog {
    let mut sections = Vec::new();
    let mut reverse_index = ReverseIndex::new();

    for section in &document.sections {
        if section.references.is_empty() {
            continue;
        }

        let mut targets = SectionTargets {
            section_number: section.number.clone(),
            ..SectionTargets::default()
        };
        for reference in &section.references {
            let bucket = targets.bucket_mut(reference.kind);
            if !bucket.contains(&reference.target) {
                bucket.push(reference.target.clone());
            }

            let citing = reverse_index
                .entry(reference.kind.as_str().to_string())
                .or_default()
                .entry(reference.target.clone())
                .or_default();
            if !citing.contains(&section.number) {
                citing.push(section.number.clone());
            }
        }
        sections.push(targets);
    }

    for targets in reverse_index.values_mut() {
        for citing in targets.values_mut() {
            citing.sort_by(|left, right| compare_section_labels(left, right));
        }
    }

    ActCatalog {
        act_id: document.act_id.clone(),
        sections,
        reverse_index,
    }
}

/// Catalog across documents, ordered by act id.
pub fn build_catalog<'a>(documents: impl IntoIterator<Item = &'a Document>) -> ReferenceCatalog {
    let mut acts: Vec<ActCatalog> = documents.into_iter().map(build_act_catalog).collect();
    acts.sort_by(|left, right| left.act_id.cmp(&right.act_id));
    ReferenceCatalog { acts }
}

/// Numeric order ("9" before "10", "21" before "21A"), label text as the
/// tie-breaker.
pub fn compare_section_labels(left: &str, right: &str) -> Ordering {
    section_sort_value(left)
        .total_cmp(&section_sort_value(right))
        .then_with(|| left.cmp(right))
}
