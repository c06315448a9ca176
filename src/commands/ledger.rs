//! Append-only SQLite diagnostics ledger shared by every batch command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::model::{ActRunOutcome, ArrangementDiff, QaFlag};
use crate::structure::normalizer::NormalizeReport;
use crate::util::{ensure_directory, now_utc_string, utc_compact_string};

const LEDGER_SCHEMA_VERSION: &str = "1";

/// Tables reported by `status`, in creation order.
pub const LEDGER_TABLES: &[&str] = &[
    "parse_log",
    "normalize_log",
    "reference_log",
    "reference_flags",
    "arrangement_log",
    "alignment_log",
];

pub fn ledger_path(data_root: &Path) -> PathBuf {
    data_root.join("logs").join("diagnostics.sqlite")
}

pub fn new_run_id(ts: DateTime<Utc>) -> String {
    format!("run-{}", utc_compact_string(ts))
}

pub struct Ledger {
    connection: Connection,
    run_id: String,
}

impl Ledger {
    pub fn open(data_root: &Path, run_id: &str) -> Result<Self> {
        let path = ledger_path(data_root);
        if let Some(parent) = path.parent() {
            ensure_directory(parent)?;
        }

        let connection = Connection::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;

        Ok(Self {
            connection,
            run_id: run_id.to_string(),
        })
    }

    pub fn record_parse(&self, outcome: &ActRunOutcome, source: &str) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO parse_log(
                  run_id, logged_at, act_id, source, status, sections, chapters,
                  footnotes, document_notes, written, failure_reason
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ",
                params![
                    &self.run_id,
                    now_utc_string(),
                    &outcome.act_id,
                    source,
                    &outcome.status,
                    outcome.sections as i64,
                    outcome.chapters as i64,
                    outcome.footnotes as i64,
                    outcome.document_notes as i64,
                    outcome.written,
                    &outcome.failure_reason,
                ],
            )
            .context("failed to insert parse_log row")?;
        Ok(())
    }

    pub fn record_normalize(
        &self,
        act_id: &str,
        file: &str,
        report: &NormalizeReport,
        written: bool,
    ) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO normalize_log(
                  run_id, logged_at, act_id, file, sections_changed,
                  doc_notes_changed, fields_changed, written
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
                params![
                    &self.run_id,
                    now_utc_string(),
                    act_id,
                    file,
                    report.sections_changed as i64,
                    report.doc_notes_changed as i64,
                    report.fields_changed as i64,
                    written,
                ],
            )
            .context("failed to insert normalize_log row")?;
        Ok(())
    }

    /// One `reference_log` row plus one `reference_flags` row per flag, in a
    /// single transaction.
    pub fn record_references(
        &mut self,
        act_id: &str,
        file: &str,
        references_detected: usize,
        flags: &[QaFlag],
    ) -> Result<()> {
        let logged_at = now_utc_string();
        let tx = self.connection.transaction()?;

        tx.execute(
            "
            INSERT INTO reference_log(run_id, logged_at, act_id, file, references_detected, qa_flags)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                &self.run_id,
                &logged_at,
                act_id,
                file,
                references_detected as i64,
                flags.len() as i64,
            ],
        )
        .context("failed to insert reference_log row")?;
        let log_id = tx.last_insert_rowid();

        {
            let mut statement = tx.prepare(
                "
                INSERT INTO reference_flags(log_id, act_id, section_number, field, issue, context)
                VALUES(?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )?;
            for flag in flags {
                statement
                    .execute(params![
                        log_id,
                        act_id,
                        &flag.section_number,
                        &flag.field,
                        flag.issue.as_str(),
                        &flag.context,
                    ])
                    .context("failed to insert reference_flags row")?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn record_arrangement(
        &self,
        act_id: &str,
        structured: &str,
        canonical_total: usize,
        parsed_total: usize,
        diff: &ArrangementDiff,
    ) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO arrangement_log(
                  run_id, logged_at, act_id, structured_file, canonical_total,
                  parsed_total, missing, extra, order_mismatches
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
                params![
                    &self.run_id,
                    now_utc_string(),
                    act_id,
                    structured,
                    canonical_total as i64,
                    parsed_total as i64,
                    diff.missing.len() as i64,
                    diff.extra.len() as i64,
                    diff.order_mismatches.len() as i64,
                ],
            )
            .context("failed to insert arrangement_log row")?;
        Ok(())
    }

    pub fn record_alignment(
        &self,
        act_id: &str,
        output: &str,
        aligned: usize,
        gaps: &[String],
    ) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO alignment_log(run_id, logged_at, act_id, output, aligned, gaps, gap_sections)
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
                params![
                    &self.run_id,
                    now_utc_string(),
                    act_id,
                    output,
                    aligned as i64,
                    gaps.len() as i64,
                    gaps.join(","),
                ],
            )
            .context("failed to insert alignment_log row")?;
        Ok(())
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS parse_log (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              run_id TEXT NOT NULL,
              logged_at TEXT NOT NULL,
              act_id TEXT NOT NULL,
              source TEXT NOT NULL,
              status TEXT NOT NULL,
              sections INTEGER NOT NULL,
              chapters INTEGER NOT NULL,
              footnotes INTEGER NOT NULL,
              document_notes INTEGER NOT NULL,
              written INTEGER NOT NULL,
              failure_reason TEXT
            );

            CREATE TABLE IF NOT EXISTS normalize_log (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              run_id TEXT NOT NULL,
              logged_at TEXT NOT NULL,
              act_id TEXT NOT NULL,
              file TEXT NOT NULL,
              sections_changed INTEGER NOT NULL,
              doc_notes_changed INTEGER NOT NULL,
              fields_changed INTEGER NOT NULL,
              written INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reference_log (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              run_id TEXT NOT NULL,
              logged_at TEXT NOT NULL,
              act_id TEXT NOT NULL,
              file TEXT NOT NULL,
              references_detected INTEGER NOT NULL,
              qa_flags INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reference_flags (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              log_id INTEGER NOT NULL,
              act_id TEXT NOT NULL,
              section_number TEXT NOT NULL,
              field TEXT NOT NULL,
              issue TEXT NOT NULL,
              context TEXT NOT NULL,
              FOREIGN KEY(log_id) REFERENCES reference_log(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS arrangement_log (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              run_id TEXT NOT NULL,
              logged_at TEXT NOT NULL,
              act_id TEXT NOT NULL,
              structured_file TEXT NOT NULL,
              canonical_total INTEGER NOT NULL,
              parsed_total INTEGER NOT NULL,
              missing INTEGER NOT NULL,
              extra INTEGER NOT NULL,
              order_mismatches INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alignment_log (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              run_id TEXT NOT NULL,
              logged_at TEXT NOT NULL,
              act_id TEXT NOT NULL,
              output TEXT NOT NULL,
              aligned INTEGER NOT NULL,
              gaps INTEGER NOT NULL,
              gap_sections TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reference_flags_log ON reference_flags(log_id);
            CREATE INDEX IF NOT EXISTS idx_reference_flags_issue ON reference_flags(act_id, issue);
            ",
        )
        .context("failed to create ledger schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('ledger_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [LEDGER_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Row count of a ledger table; `None` when the table does not exist yet.
pub fn table_row_count(connection: &Connection, table: &str) -> Result<Option<i64>> {
    let exists: i64 = connection.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(None);
    }

    let count = connection.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(Some(count))
}
