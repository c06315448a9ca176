use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::acts::{ActConfig, SecondarySource};
use crate::cli::AlignArgs;
use crate::commands::ledger::new_run_id;
use crate::commands::{BatchFailures, load_document, open_ledger, require_file, resolve_acts};
use crate::model::BilingualEntry;
use crate::structure::bilingual::{
    AlignmentResult, SectionKeying, SplitOptions, align_sections, normalize_secondary_numerals,
    split_secondary_sections,
};
use crate::util::write_bytes_if_changed;

pub fn run(args: AlignArgs) -> Result<()> {
    let scope = &args.scope;
    let run_id = new_run_id(Utc::now());
    let selected = resolve_acts(scope)?;

    let acts: Vec<(&ActConfig, &SecondarySource)> = selected
        .iter()
        .filter_map(|act| act.secondary.as_ref().map(|secondary| (act, secondary)))
        .collect();
    if acts.is_empty() {
        bail!("none of the selected acts declares a secondary-language source");
    }

    let options = SplitOptions {
        keying: if args.sequential_keys {
            SectionKeying::Sequential
        } else {
            SectionKeying::Detected
        },
        max_section: args.max_section,
    };

    let ledger = open_ledger(scope, &run_id)?;
    let mut failures = BatchFailures::default();

    for (act, secondary) in acts {
        let output = scope.data_root.join(&secondary.output);
        match align_act(
            &scope.data_root,
            act,
            secondary,
            options,
            args.normalize_numerals,
            scope.dry_run,
        ) {
            Ok(result) => {
                if let Some(ledger) = ledger.as_ref() {
                    ledger.record_alignment(
                        &act.act_id,
                        &secondary.output.display().to_string(),
                        result.entries.len(),
                        &result.gaps,
                    )?;
                }
                info!(
                    act_id = %act.act_id,
                    output = %output.display(),
                    aligned = result.entries.len(),
                    gaps = result.gaps.len(),
                    "alignment complete"
                );
            }
            Err(err) => failures.record(&act.act_id, &err),
        }
    }

    failures.finish("align")
}

pub(crate) fn align_act(
    data_root: &Path,
    act: &ActConfig,
    secondary: &SecondarySource,
    options: SplitOptions,
    normalize_numerals: bool,
    dry_run: bool,
) -> Result<AlignmentResult> {
    let document = load_document(&data_root.join(&act.target))?;

    let source = data_root.join(&secondary.source);
    require_file(&source)?;
    let raw = fs::read_to_string(&source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let text = if normalize_numerals {
        normalize_secondary_numerals(&raw)
    } else {
        raw
    };

    let spans = split_secondary_sections(&text, options);
    let result = align_sections(
        &document,
        &spans,
        &secondary.language,
        &secondary.source.display().to_string(),
        options.max_section,
    );

    if !result.gaps.is_empty() {
        warn!(
            act_id = %act.act_id,
            gaps = %result.gaps.join(", "),
            "sections without secondary text"
        );
    }

    if !dry_run {
        let output = data_root.join(&secondary.output);
        let written = write_bytes_if_changed(&output, &render_jsonl(&result.entries)?)?;
        info!(act_id = %act.act_id, path = %output.display(), written, "wrote bilingual alignment");
    }

    Ok(result)
}

/// One compact JSON object per line with a trailing newline.
pub(crate) fn render_jsonl(entries: &[BilingualEntry]) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut data, entry).context("failed to serialize alignment entry")?;
        data.push(b'\n');
    }
    Ok(data)
}
