use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use crate::acts::load_registry;
use crate::cli::StatusArgs;
use crate::commands::ledger::{LEDGER_TABLES, ledger_path, table_row_count};
use crate::model::Document;
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let acts = load_registry(args.acts_config.as_deref())?;
    info!(data_root = %args.data_root.display(), acts = acts.len(), "status requested");

    for act in &acts {
        let target = args.data_root.join(&act.target);
        if !target.exists() {
            warn!(act_id = %act.act_id, path = %target.display(), "structured document missing");
            continue;
        }

        match read_json::<Document>(&target) {
            Ok(document) => {
                let references: usize = document
                    .sections
                    .iter()
                    .map(|section| section.references.len())
                    .sum();
                info!(
                    act_id = %act.act_id,
                    sections = document.sections.len(),
                    chapters = document.chapters.len(),
                    references,
                    source_present = args.data_root.join(&act.source).exists(),
                    "structured document"
                );
            }
            Err(err) => {
                warn!(act_id = %act.act_id, error = %format!("{err:#}"), "unreadable structured document");
            }
        }
    }

    match latest_parse_manifest(&args.data_root.join("manifests"))? {
        Some(path) => info!(path = %path.display(), "latest parse manifest"),
        None => warn!("no parse run manifest found"),
    }

    let db_path = ledger_path(&args.data_root);
    if db_path.exists() {
        let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        for table in LEDGER_TABLES {
            let rows = table_row_count(&conn, table)?.unwrap_or(0);
            info!(table = *table, rows, "ledger table");
        }
    } else {
        warn!(path = %db_path.display(), "diagnostics ledger missing");
    }

    Ok(())
}

/// Manifest names embed a compact UTC timestamp, so the lexically greatest
/// name is the most recent run.
fn latest_parse_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to list {}", manifest_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("parse_run_") && name.ends_with(".json"));
        if is_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
