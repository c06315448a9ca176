pub mod align;
pub mod arrangement;
pub mod catalog;
pub mod ledger;
pub mod normalize;
pub mod parse;
pub mod references;
pub mod status;
#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::error;

use crate::acts::{ActConfig, load_registry, select_acts};
use crate::cli::ScopeArgs;
use crate::commands::ledger::Ledger;
use crate::error::PipelineError;
use crate::model::Document;
use crate::util::read_json;

pub(crate) fn resolve_acts(scope: &ScopeArgs) -> Result<Vec<ActConfig>> {
    let registry = load_registry(scope.acts_config.as_deref())?;
    select_acts(registry, scope.act.as_deref())
}

/// Dry runs never touch the ledger.
pub(crate) fn open_ledger(scope: &ScopeArgs, run_id: &str) -> Result<Option<Ledger>> {
    if scope.dry_run {
        return Ok(None);
    }
    Ledger::open(&scope.data_root, run_id).map(Some)
}

pub(crate) fn require_file(path: &Path) -> Result<(), PipelineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::MissingSource {
            path: path.to_path_buf(),
        })
    }
}

pub(crate) fn load_document(path: &Path) -> Result<Document> {
    require_file(path)?;
    read_json(path)
}

/// Relative form of `path` used in logs and outputs, so that records do not
/// depend on where the data root lives.
pub(crate) fn display_relative(data_root: &Path, path: &Path) -> String {
    path.strip_prefix(data_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(path))
        .display()
        .to_string()
}

/// Failures collected while processing a batch of acts.
#[derive(Debug, Default)]
pub(crate) struct BatchFailures {
    failed: Vec<String>,
}

impl BatchFailures {
    pub(crate) fn record(&mut self, act_id: &str, err: &anyhow::Error) {
        error!(act_id = %act_id, error = %format!("{err:#}"), "act failed");
        self.failed.push(act_id.to_string());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn finish(self, command: &str) -> Result<()> {
        if self.failed.is_empty() {
            return Ok(());
        }
        bail!(
            "{command} failed for {} act(s): {}",
            self.failed.len(),
            self.failed.join(", ")
        )
    }
}
