use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CatalogArgs;
use crate::commands::{BatchFailures, load_document, resolve_acts};
use crate::structure::catalog::build_catalog;
use crate::util::write_json_if_changed;

pub fn run(args: CatalogArgs) -> Result<()> {
    let scope = &args.scope;
    let acts = resolve_acts(scope)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| scope.data_root.join("catalog").join("reference_catalog.json"));

    let mut documents = Vec::new();
    let mut failures = BatchFailures::default();
    for act in &acts {
        match load_document(&scope.data_root.join(&act.target)) {
            Ok(document) => documents.push(document),
            Err(err) => failures.record(&act.act_id, &err),
        }
    }

    let catalog = build_catalog(&documents);
    info!(
        acts = catalog.acts.len(),
        targets = catalog.total_targets(),
        "built reference catalog"
    );

    // A partial catalog would silently drop the failed acts' entries.
    if !failures.is_empty() {
        warn!(path = %output.display(), "catalog not written");
        return failures.finish("catalog");
    }

    if scope.dry_run {
        info!(path = %output.display(), "dry run; catalog not written");
        return Ok(());
    }

    let written = write_json_if_changed(&output, &catalog)?;
    info!(path = %output.display(), written, "catalog complete");
    Ok(())
}
