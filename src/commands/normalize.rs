use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::acts::ActConfig;
use crate::cli::NormalizeArgs;
use crate::commands::ledger::new_run_id;
use crate::commands::{BatchFailures, load_document, open_ledger, resolve_acts};
use crate::structure::normalizer::{NormalizeReport, normalize_document};
use crate::util::write_json_if_changed;

pub fn run(args: NormalizeArgs) -> Result<()> {
    let scope = &args.scope;
    let run_id = new_run_id(Utc::now());
    let acts = resolve_acts(scope)?;
    let ledger = open_ledger(scope, &run_id)?;

    let mut failures = BatchFailures::default();
    let mut files_changed = 0usize;

    for act in &acts {
        match normalize_act(&scope.data_root, act, scope.dry_run) {
            Ok((report, written)) => {
                if !report.changed() {
                    continue;
                }
                files_changed += 1;
                if let Some(ledger) = ledger.as_ref() {
                    ledger.record_normalize(
                        &act.act_id,
                        &act.target.display().to_string(),
                        &report,
                        written,
                    )?;
                }
            }
            Err(err) => failures.record(&act.act_id, &err),
        }
    }

    info!(
        run_id = %run_id,
        acts = acts.len(),
        files_changed,
        dry_run = scope.dry_run,
        "normalization complete"
    );

    failures.finish("normalize")
}

pub(crate) fn normalize_act(
    data_root: &Path,
    act: &ActConfig,
    dry_run: bool,
) -> Result<(NormalizeReport, bool)> {
    let path = data_root.join(&act.target);
    let mut document = load_document(&path)?;
    let report = normalize_document(&mut document);

    let written = report.changed() && !dry_run && write_json_if_changed(&path, &document)?;

    info!(
        act_id = %act.act_id,
        sections_changed = report.sections_changed,
        doc_notes_changed = report.doc_notes_changed,
        fields_changed = report.fields_changed,
        written,
        "normalized document"
    );

    Ok((report, written))
}
