use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::acts::ActConfig;
use crate::cli::ParseArgs;
use crate::commands::ledger::new_run_id;
use crate::commands::{BatchFailures, display_relative, open_ledger, require_file, resolve_acts};
use crate::model::{ActRunOutcome, ParseRunManifest, QaFlag, SourceHash};
use crate::structure::Pipeline;
use crate::util::{
    now_utc_string, sha256_file, utc_compact_string, write_json_if_changed, write_json_pretty,
};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: ParseArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = new_run_id(started_ts);
    let scope = &args.scope;

    let acts = resolve_acts(scope)?;
    let pipeline = Pipeline::new()?;
    let mut ledger = open_ledger(scope, &run_id)?;

    info!(
        data_root = %scope.data_root.display(),
        run_id = %run_id,
        acts = acts.len(),
        dry_run = scope.dry_run,
        "starting parse"
    );

    let mut outcomes = Vec::new();
    let mut source_hashes = Vec::new();
    let mut warnings = Vec::new();
    let mut failures = BatchFailures::default();

    for act in &acts {
        let source_label = display_relative(&scope.data_root, &scope.data_root.join(&act.source));
        let outcome = match parse_act(&pipeline, &scope.data_root, act, scope.dry_run) {
            Ok(parsed) => {
                if let Some(ledger) = ledger.as_mut() {
                    let target = act.target.display().to_string();
                    ledger.record_references(
                        &act.act_id,
                        &target,
                        parsed.outcome.references,
                        &parsed.flags,
                    )?;
                }
                if !parsed.flags.is_empty() {
                    warnings.push(format!(
                        "{}: {} ambiguous mention(s) flagged for review",
                        act.act_id,
                        parsed.flags.len()
                    ));
                }
                source_hashes.push(parsed.source_hash);
                parsed.outcome
            }
            Err(err) => {
                failures.record(&act.act_id, &err);
                failed_outcome(&act.act_id, &err)
            }
        };

        if let Some(ledger) = ledger.as_ref() {
            ledger.record_parse(&outcome, &source_label)?;
        }
        outcomes.push(outcome);
    }

    let status = if failures.is_empty() { "completed" } else { "failed" };
    if !scope.dry_run {
        let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
            scope
                .data_root
                .join("manifests")
                .join(format!("parse_run_{}.json", utc_compact_string(started_ts)))
        });
        let manifest = ParseRunManifest {
            manifest_version: MANIFEST_VERSION,
            run_id: run_id.clone(),
            status: status.to_string(),
            started_at,
            updated_at: now_utc_string(),
            data_root: scope.data_root.display().to_string(),
            act_filter: scope.act.clone(),
            outcomes: outcomes.clone(),
            source_hashes,
            warnings: warnings.clone(),
        };
        write_json_pretty(&manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote parse run manifest");
    }

    for warning in &warnings {
        warn!(warning = %warning, "parse warning");
    }
    info!(
        run_id = %run_id,
        status = status,
        acts = outcomes.len(),
        written = outcomes.iter().filter(|outcome| outcome.written).count(),
        "parse complete"
    );

    failures.finish("parse")
}

#[derive(Debug)]
pub(crate) struct ParsedAct {
    pub outcome: ActRunOutcome,
    pub flags: Vec<QaFlag>,
    pub source_hash: SourceHash,
}

/// Structures one act and writes its document when it differs from the
/// stored one. Nothing is written for a failing act.
pub(crate) fn parse_act(
    pipeline: &Pipeline,
    data_root: &Path,
    act: &ActConfig,
    dry_run: bool,
) -> Result<ParsedAct> {
    let source = data_root.join(&act.source);
    require_file(&source)?;

    let text = fs::read_to_string(&source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let sha256 = sha256_file(&source)?;

    let structured = pipeline.structure_act(&text, act)?;
    let document = &structured.document;

    let target = data_root.join(&act.target);
    let written = if dry_run {
        false
    } else {
        write_json_if_changed(&target, document)?
    };

    let footnotes = document
        .sections
        .iter()
        .map(|section| section.amendments.len())
        .sum();
    let status = if dry_run {
        "dry_run"
    } else if written {
        "written"
    } else {
        "unchanged"
    };
    let outcome = ActRunOutcome {
        act_id: act.act_id.clone(),
        status: status.to_string(),
        sections: document.sections.len(),
        chapters: document.chapters.len(),
        footnotes,
        document_notes: document.document_notes.len(),
        references: structured.references.references_detected,
        qa_flags: structured.references.flags.len(),
        written,
        failure_reason: None,
    };

    info!(
        act_id = %act.act_id,
        sections = outcome.sections,
        chapters = outcome.chapters,
        footnotes = outcome.footnotes,
        references = outcome.references,
        qa_flags = outcome.qa_flags,
        normalized_fields = structured.normalize.fields_changed,
        status = %outcome.status,
        "parsed act"
    );

    Ok(ParsedAct {
        outcome,
        flags: structured.references.flags,
        source_hash: SourceHash {
            act_id: act.act_id.clone(),
            source: display_relative(data_root, &source),
            sha256,
        },
    })
}

fn failed_outcome(act_id: &str, err: &anyhow::Error) -> ActRunOutcome {
    ActRunOutcome {
        act_id: act_id.to_string(),
        status: "failed".to_string(),
        sections: 0,
        chapters: 0,
        footnotes: 0,
        document_notes: 0,
        references: 0,
        qa_flags: 0,
        written: false,
        failure_reason: Some(format!("{err:#}")),
    }
}
