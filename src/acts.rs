use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::model::GroupKind;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Numbering {
    Article,
    Section,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrdering {
    ConstitutionParts,
    Roman,
    Unchecked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondarySource {
    pub language: String,
    pub source: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActConfig {
    pub act_id: String,
    pub language: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub numbering: Numbering,
    #[serde(default)]
    pub expected_min_sections: Option<usize>,
    #[serde(default)]
    pub expected_max_sections: Option<usize>,
    #[serde(default)]
    pub require_start_trigger: bool,
    #[serde(default = "default_group_ordering")]
    pub group_ordering: GroupOrdering,
    #[serde(default)]
    pub arrangement: Option<PathBuf>,
    #[serde(default)]
    pub secondary: Option<SecondarySource>,
}

fn default_group_ordering() -> GroupOrdering {
    GroupOrdering::Roman
}

/// Line-level behaviour of the segmenter, derived from an act's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentProfile {
    pub group_kind: GroupKind,
    pub require_start_trigger: bool,
    pub inline_group_titles: bool,
    pub split_inline_sections: bool,
    pub split_heading_dash: bool,
    pub clean_bracket_artifacts: bool,
}

impl ActConfig {
    pub fn profile(&self) -> SegmentProfile {
        match self.numbering {
            Numbering::Article => SegmentProfile {
                group_kind: GroupKind::Part,
                require_start_trigger: self.require_start_trigger,
                inline_group_titles: false,
                split_inline_sections: false,
                split_heading_dash: false,
                clean_bracket_artifacts: true,
            },
            Numbering::Section => SegmentProfile {
                group_kind: GroupKind::Chapter,
                require_start_trigger: self.require_start_trigger,
                inline_group_titles: true,
                split_inline_sections: true,
                split_heading_dash: true,
                clean_bracket_artifacts: false,
            },
        }
    }

    pub fn matches_filter(&self, filter: Option<&str>) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        let needle = filter.to_ascii_lowercase();
        if self.act_id.to_ascii_lowercase().contains(&needle) {
            return true;
        }

        [&self.source, &self.target].iter().any(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.to_ascii_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }
}

pub fn builtin_acts() -> Vec<ActConfig> {
    vec![
        ActConfig {
            act_id: "CONST-1950".to_string(),
            language: "en".to_string(),
            source: PathBuf::from("processed/pdf/constitution_of_india.txt"),
            target: PathBuf::from("structured/constitution_en.json"),
            numbering: Numbering::Article,
            expected_min_sections: Some(350),
            expected_max_sections: Some(500),
            require_start_trigger: false,
            group_ordering: GroupOrdering::ConstitutionParts,
            arrangement: Some(PathBuf::from("catalog/arrangement_official.txt")),
            secondary: None,
        },
        statute("BNS-2023", "processed/pdf/bns_2023_en.txt", "structured/bns_en.json", 350, 400, true)
            .with_secondary(SecondarySource {
                language: "hi".to_string(),
                source: PathBuf::from("processed/pdf/bns_2023_hi.txt"),
                output: PathBuf::from("structured/bns_bilingual.jsonl"),
            }),
        statute("BNSS-2023", "processed/pdf/bnss_2023_en.txt", "structured/bnss_en.json", 300, 700, true),
        statute("BSA-2023", "processed/pdf/bsa_2023_en.txt", "structured/bsa_en.json", 150, 250, true),
        statute("IPC-1860", "processed/pdf/ipc_1860_en.txt", "structured/ipc_en.json", 400, 600, false),
        statute("CRPC-1973", "processed/pdf/crpc_1973_en.txt", "structured/crpc_en.json", 400, 700, false),
        statute(
            "EA-1872",
            "processed/html/evidence_act_1872.txt",
            "structured/evidence_en.json",
            120,
            220,
            false,
        ),
    ]
}

fn statute(
    act_id: &str,
    source: &str,
    target: &str,
    min: usize,
    max: usize,
    require_start_trigger: bool,
) -> ActConfig {
    ActConfig {
        act_id: act_id.to_string(),
        language: "en".to_string(),
        source: PathBuf::from(source),
        target: PathBuf::from(target),
        numbering: Numbering::Section,
        expected_min_sections: Some(min),
        expected_max_sections: Some(max),
        require_start_trigger,
        group_ordering: GroupOrdering::Roman,
        arrangement: None,
        secondary: None,
    }
}

impl ActConfig {
    fn with_secondary(mut self, secondary: SecondarySource) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

/// Loads the act registry, either from a JSON override or the built-ins.
pub fn load_registry(acts_config: Option<&Path>) -> Result<Vec<ActConfig>> {
    let Some(path) = acts_config else {
        return Ok(builtin_acts());
    };

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let acts: Vec<ActConfig> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if acts.is_empty() {
        bail!("act registry is empty: {}", path.display());
    }

    Ok(acts)
}

pub fn select_acts(acts: Vec<ActConfig>, filter: Option<&str>) -> Result<Vec<ActConfig>> {
    let selected = acts
        .into_iter()
        .filter(|act| act.matches_filter(filter))
        .collect::<Vec<_>>();
    if selected.is_empty() {
        bail!(
            "no acts matched the provided filter: {}",
            filter.unwrap_or_default()
        );
    }

    Ok(selected)
}
