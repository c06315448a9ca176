use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::acts::ActConfig;
use crate::cli::ArrangementArgs;
use crate::commands::ledger::{Ledger, new_run_id};
use crate::commands::{BatchFailures, display_relative, load_document, open_ledger, resolve_acts};
use crate::model::ArrangementDiff;
use crate::structure::arrangement::{
    compare_arrangements, load_canonical_list, parsed_order, render_snapshot,
};
use crate::util::write_bytes_if_changed;

const PREVIEW_ITEMS: usize = 5;

pub fn run(args: ArrangementArgs) -> Result<()> {
    let scope = &args.scope;
    let run_id = new_run_id(Utc::now());
    let selected = resolve_acts(scope)?;

    let overridden = args.canonical.is_some() || args.structured.is_some();
    if overridden && selected.len() != 1 {
        bail!(
            "--canonical/--structured need exactly one act; {} matched (use --act)",
            selected.len()
        );
    }

    let acts: Vec<&ActConfig> = selected
        .iter()
        .filter(|act| {
            let checkable = overridden || act.arrangement.is_some();
            if !checkable {
                info!(act_id = %act.act_id, "no canonical arrangement configured; skipping");
            }
            checkable
        })
        .collect();
    if acts.is_empty() {
        bail!("none of the selected acts has a canonical arrangement list");
    }

    let ledger = open_ledger(scope, &run_id)?;
    let mut failures = BatchFailures::default();

    for act in acts {
        let canonical = args
            .canonical
            .clone()
            .or_else(|| act.arrangement.as_ref().map(|path| scope.data_root.join(path)));
        let structured = args
            .structured
            .clone()
            .unwrap_or_else(|| scope.data_root.join(&act.target));

        let result = canonical
            .ok_or_else(|| anyhow!("no canonical arrangement list for {}", act.act_id))
            .and_then(|canonical| {
                check_act(
                    &scope.data_root,
                    act,
                    &canonical,
                    &structured,
                    scope.dry_run,
                    ledger.as_ref(),
                )
            });

        match result {
            Ok(diff) if diff.is_clean() => {}
            Ok(diff) => failures.record(
                &act.act_id,
                &anyhow!(
                    "arrangement diverges: {} missing, {} extra, {} order mismatches",
                    diff.missing.len(),
                    diff.extra.len(),
                    diff.order_mismatches.len()
                ),
            ),
            Err(err) => failures.record(&act.act_id, &err),
        }
    }

    failures.finish("arrangement")
}

pub(crate) fn snapshot_path(data_root: &Path, act: &ActConfig) -> PathBuf {
    data_root.join("catalog").join(format!(
        "{}_arrangement_snapshot.txt",
        act.act_id.to_ascii_lowercase()
    ))
}

pub(crate) fn check_act(
    data_root: &Path,
    act: &ActConfig,
    canonical_path: &Path,
    structured_path: &Path,
    dry_run: bool,
    ledger: Option<&Ledger>,
) -> Result<ArrangementDiff> {
    let canonical = load_canonical_list(canonical_path)?;
    let document = load_document(structured_path)?;
    let parsed = parsed_order(&document);
    if parsed.is_empty() {
        bail!("no sections found in {}", structured_path.display());
    }

    let diff = compare_arrangements(&canonical, &parsed);

    info!(
        act_id = %act.act_id,
        canonical = canonical.len(),
        parsed = parsed.len(),
        missing = diff.missing.len(),
        extra = diff.extra.len(),
        order_mismatches = diff.order_mismatches.len(),
        "arrangement check"
    );
    if !diff.missing.is_empty() {
        warn!(act_id = %act.act_id, sample = %preview(&diff.missing), "missing entries");
    }
    if !diff.extra.is_empty() {
        warn!(act_id = %act.act_id, sample = %preview(&diff.extra), "extra entries");
    }
    if let Some(first) = diff.order_mismatches.first() {
        warn!(
            act_id = %act.act_id,
            position = first.position,
            expected = %first.expected,
            found = %first.found,
            "order mismatch"
        );
    }

    if !dry_run {
        let snapshot = snapshot_path(data_root, act);
        write_bytes_if_changed(&snapshot, render_snapshot(&parsed).as_bytes())?;
        if let Some(ledger) = ledger {
            ledger.record_arrangement(
                &act.act_id,
                &display_relative(data_root, structured_path),
                canonical.len(),
                parsed.len(),
                &diff,
            )?;
        }
    }

    Ok(diff)
}

fn preview(items: &[String]) -> String {
    let mut sample = items
        .iter()
        .take(PREVIEW_ITEMS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > PREVIEW_ITEMS {
        sample.push_str(" ...");
    }
    sample
}
