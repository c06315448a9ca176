use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::acts::ActConfig;
use crate::cli::ReferencesArgs;
use crate::commands::ledger::new_run_id;
use crate::commands::{BatchFailures, load_document, open_ledger, resolve_acts};
use crate::structure::references::{ReferenceExtractor, ReferenceReport};
use crate::util::write_json_if_changed;

pub fn run(args: ReferencesArgs) -> Result<()> {
    let scope = &args.scope;
    let run_id = new_run_id(Utc::now());
    let acts = resolve_acts(scope)?;
    let extractor = ReferenceExtractor::new()?;
    let mut ledger = open_ledger(scope, &run_id)?;

    let mut failures = BatchFailures::default();
    let mut total_references = 0usize;
    let mut total_flags = 0usize;

    for act in &acts {
        match annotate_act(&extractor, &scope.data_root, act, scope.dry_run) {
            Ok(report) => {
                total_references += report.references_detected;
                total_flags += report.flags.len();
                if let Some(ledger) = ledger.as_mut() {
                    ledger.record_references(
                        &act.act_id,
                        &act.target.display().to_string(),
                        report.references_detected,
                        &report.flags,
                    )?;
                }
            }
            Err(err) => failures.record(&act.act_id, &err),
        }
    }

    info!(
        run_id = %run_id,
        references = total_references,
        qa_flags = total_flags,
        dry_run = scope.dry_run,
        "reference extraction complete"
    );

    failures.finish("references")
}

pub(crate) fn annotate_act(
    extractor: &ReferenceExtractor,
    data_root: &Path,
    act: &ActConfig,
    dry_run: bool,
) -> Result<ReferenceReport> {
    let path = data_root.join(&act.target);
    let mut document = load_document(&path)?;
    let report = extractor.annotate_references(&mut document);

    let written =
        report.sections_changed > 0 && !dry_run && write_json_if_changed(&path, &document)?;

    for flag in report.flags.iter().take(5) {
        warn!(
            act_id = %act.act_id,
            section = %flag.section_number,
            field = %flag.field,
            issue = flag.issue.as_str(),
            context = %flag.context,
            "ambiguous mention"
        );
    }
    info!(
        act_id = %act.act_id,
        references = report.references_detected,
        qa_flags = report.flags.len(),
        sections_changed = report.sections_changed,
        written,
        "annotated references"
    );

    Ok(report)
}
