use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub act_id: String,
    pub language: String,
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_notes: Vec<Footnote>,
}

/// A section of a statute or an article of the constitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub number: String,
    pub heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<Clause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amendments: Vec<Footnote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
}

impl Section {
    pub fn new(number: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            heading: heading.into(),
            chapter: None,
            subheading: None,
            schedule: None,
            text: None,
            intro: None,
            clauses: Vec::new(),
            amendments: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn group_code(&self) -> Option<&str> {
        self.chapter
            .as_ref()
            .map(|chapter| chapter.code.as_str())
            .filter(|code| !code.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Chapter,
    Part,
}

impl GroupKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Chapter => "CHAPTER",
            Self::Part => "PART",
        }
    }
}

/// Chapter (statutes) or part (constitution) heading context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub kind: GroupKind,
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    Numeric,
    AlphaUpper,
    AlphaLower,
    Roman,
}

/// A labelled clause. Leaves carry no `children` field when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(rename = "type")]
    pub kind: ClauseKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Clause>,
}

impl Clause {
    /// Depth of the subtree rooted at this clause; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Clause::depth).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FootnoteKind {
    Substitution,
    Insertion,
    Addition,
    Omission,
    Note,
}

/// Amendment footnote attached to a section or to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    pub marker: String,
    pub kind: FootnoteKind,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Article,
    Part,
    Schedule,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Part => "part",
            Self::Schedule => "schedule",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub target: String,
    pub field: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionIssue {
    ArticleMentionWithoutNumber,
    PartMentionWithoutCode,
    ScheduleMentionWithoutName,
}

impl MentionIssue {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ArticleMentionWithoutNumber => "article_mention_without_number",
            Self::PartMentionWithoutCode => "part_mention_without_code",
            Self::ScheduleMentionWithoutName => "schedule_mention_without_name",
        }
    }
}

/// A reference-like phrase that could not be resolved to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaFlag {
    pub section_number: String,
    pub field: String,
    pub issue: MentionIssue,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderMismatch {
    pub position: usize,
    pub expected: String,
    pub found: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArrangementDiff {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub order_mismatches: Vec<OrderMismatch>,
}

impl ArrangementDiff {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.order_mismatches.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualEntry {
    pub act_id: String,
    pub section_number: String,
    pub heading: String,
    pub text: String,
    pub secondary_language: String,
    pub secondary_text: String,
    pub secondary_source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceHash {
    pub act_id: String,
    pub source: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActRunOutcome {
    pub act_id: String,
    pub status: String,
    pub sections: usize,
    pub chapters: usize,
    pub footnotes: usize,
    pub document_notes: usize,
    pub references: usize,
    pub qa_flags: usize,
    pub written: bool,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub data_root: String,
    pub act_filter: Option<String>,
    pub outcomes: Vec<ActRunOutcome>,
    pub source_hashes: Vec<SourceHash>,
    pub warnings: Vec<String>,
}
