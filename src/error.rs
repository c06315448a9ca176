use std::path::PathBuf;

use thiserror::Error;

/// Fatal structural problems that abort processing of a single act.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralViolation {
    #[error("{act_id}: parsed {count} sections, expected between {min} and {max}")]
    SectionCountOutOfBounds {
        act_id: String,
        count: usize,
        min: String,
        max: String,
    },

    #[error("{act_id}: unknown {keyword} code '{code}' in section {section}")]
    UnknownGroupCode {
        act_id: String,
        section: String,
        keyword: String,
        code: String,
    },

    #[error(
        "{act_id}: {keyword} order regression at section {section}: returned to {code} after {previous}"
    )]
    GroupOrderRegression {
        act_id: String,
        section: String,
        keyword: String,
        code: String,
        previous: String,
    },

    #[error("{act_id}: section {section} appears more than once")]
    DuplicateSection { act_id: String, section: String },

    #[error("{act_id}: clause depth {depth} exceeds max {max} in section {section}")]
    ClauseDepthExceeded {
        act_id: String,
        section: String,
        depth: usize,
        max: usize,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("structural violation: {0}")]
    Structural(#[from] StructuralViolation),

    #[error("required source missing: {}", path.display())]
    MissingSource { path: PathBuf },
}
