//! Core structuring pipeline: raw act text in, validated [`Document`] out.
//!
//! [`Document`]: crate::model::Document

pub mod arrangement;
pub mod bilingual;
pub mod catalog;
pub mod clause_tree;
pub mod footnotes;
pub mod normalizer;
pub mod references;
pub mod segmenter;
pub mod validation;

use anyhow::Result;

use crate::acts::ActConfig;
use crate::error::PipelineError;
use crate::model::Document;
use crate::structure::normalizer::NormalizeReport;
use crate::structure::references::{ReferenceExtractor, ReferenceReport};
use crate::structure::segmenter::Segmenter;
use crate::structure::validation::{StructureBounds, validate_document};

/// Compiled stages shared across acts of one run.
#[derive(Debug)]
pub struct Pipeline {
    segmenter: Segmenter,
    references: ReferenceExtractor,
}

#[derive(Debug)]
pub struct StructuredAct {
    pub document: Document,
    pub normalize: NormalizeReport,
    pub references: ReferenceReport,
}

impl Pipeline {
    pub fn new() -> Result<Self> {
        Ok(Self {
            segmenter: Segmenter::new()?,
            references: ReferenceExtractor::new()?,
        })
    }

    /// Segments, validates, normalizes and annotates one act. Any structural
    /// violation aborts the act before a document is produced.
    pub fn structure_act(&self, text: &str, act: &ActConfig) -> Result<StructuredAct, PipelineError> {
        let mut document =
            self.segmenter
                .segment(text, &act.act_id, &act.language, &act.profile())?;
        validate_document(&document, &StructureBounds::from(act))?;

        let normalize = normalizer::normalize_document(&mut document);
        let references = self.references.annotate_references(&mut document);

        Ok(StructuredAct {
            document,
            normalize,
            references,
        })
    }
}
