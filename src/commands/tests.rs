use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::*;
use crate::acts::{GroupOrdering, Numbering, SecondarySource};
use crate::cli::{CatalogArgs, NormalizeArgs, StatusArgs};
use crate::commands::arrangement::{check_act, snapshot_path};
use crate::commands::ledger::{LEDGER_TABLES, ledger_path, table_row_count};
use crate::commands::parse::parse_act;
use crate::structure::Pipeline;
use crate::structure::bilingual::SplitOptions;
use crate::structure::references::ReferenceExtractor;

const STATUTE_SOURCE: &str = "\
CHAPTER I
PRELIMINARY
1. Short title, extent and commencement.--(1) This Act may be called the Test Act.
(2) It extends to the whole of India.
2. Definitions.--In this Act, unless the context otherwise requires, words have their ordinary meaning.
CHAPTER II
OF PUNISHMENTS
3. Punishments.--The punishments are--
(a) death;
(b) imprisonment for life.
";

const SECONDARY_SOURCE: &str = "1. संक्षिप्त नाम\n(1) यह अधिनियम\n3. दंड\n(क) मृत्यु\n";

fn statute() -> ActConfig {
    ActConfig {
        act_id: "TEST-2024".to_string(),
        language: "en".to_string(),
        source: PathBuf::from("processed/test_act.txt"),
        target: PathBuf::from("structured/test_act.json"),
        numbering: Numbering::Section,
        expected_min_sections: Some(1),
        expected_max_sections: Some(10),
        require_start_trigger: false,
        group_ordering: GroupOrdering::Roman,
        arrangement: None,
        secondary: Some(SecondarySource {
            language: "hi".to_string(),
            source: PathBuf::from("processed/test_act_hi.txt"),
            output: PathBuf::from("structured/test_act_bilingual.jsonl"),
        }),
    }
}

fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

fn data_root_with_source() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "processed/test_act.txt", STATUTE_SOURCE);
    write_file(dir.path(), "processed/test_act_hi.txt", SECONDARY_SOURCE);
    dir
}

fn scope(data_root: &Path, dry_run: bool) -> ScopeArgs {
    let acts_config = data_root.join("acts.json");
    fs::write(&acts_config, serde_json::to_vec_pretty(&vec![statute()]).unwrap()).unwrap();
    ScopeArgs {
        data_root: data_root.to_path_buf(),
        acts_config: Some(acts_config),
        act: None,
        dry_run,
    }
}

fn parsed_root() -> TempDir {
    let dir = data_root_with_source();
    let pipeline = Pipeline::new().unwrap();
    parse_act(&pipeline, dir.path(), &statute(), false).unwrap();
    dir
}

#[test]
fn parse_writes_once_then_reports_unchanged() {
    let dir = data_root_with_source();
    let pipeline = Pipeline::new().unwrap();
    let act = statute();

    let first = parse_act(&pipeline, dir.path(), &act, false).unwrap();
    assert_eq!(first.outcome.status, "written");
    assert!(first.outcome.written);
    assert_eq!(first.outcome.sections, 3);
    assert_eq!(first.outcome.chapters, 2);
    assert_eq!(first.source_hash.source, "processed/test_act.txt");
    assert_eq!(first.source_hash.sha256.len(), 64);

    let target = dir.path().join(&act.target);
    let stored = fs::read(&target).unwrap();

    let second = parse_act(&pipeline, dir.path(), &act, false).unwrap();
    assert_eq!(second.outcome.status, "unchanged");
    assert!(!second.outcome.written);
    assert_eq!(fs::read(&target).unwrap(), stored);
}

#[test]
fn dry_run_writes_nothing_and_skips_the_ledger() {
    let dir = data_root_with_source();
    let pipeline = Pipeline::new().unwrap();
    let act = statute();

    let parsed = parse_act(&pipeline, dir.path(), &act, true).unwrap();
    assert_eq!(parsed.outcome.status, "dry_run");
    assert_eq!(parsed.outcome.sections, 3);
    assert!(!dir.path().join(&act.target).exists());

    let scope = scope(dir.path(), true);
    assert!(open_ledger(&scope, "run-test").unwrap().is_none());
    assert!(!ledger_path(dir.path()).exists());
}

#[test]
fn missing_source_is_reported_as_a_missing_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new().unwrap();

    let err = parse_act(&pipeline, dir.path(), &statute(), false).unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::MissingSource { path }) => {
            assert!(path.ends_with("processed/test_act.txt"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn normalize_and_references_leave_fresh_parse_output_alone() {
    let dir = parsed_root();
    let act = statute();
    let target = dir.path().join(&act.target);
    let stored = fs::read(&target).unwrap();

    let (report, written) = normalize::normalize_act(dir.path(), &act, false).unwrap();
    assert!(!report.changed());
    assert!(!written);

    let extractor = ReferenceExtractor::new().unwrap();
    let report = references::annotate_act(&extractor, dir.path(), &act, false).unwrap();
    assert_eq!(report.sections_changed, 0);

    assert_eq!(fs::read(&target).unwrap(), stored);
}

#[test]
fn unchanged_normalize_runs_append_no_ledger_rows() {
    let dir = parsed_root();
    for _ in 0..2 {
        normalize::run(NormalizeArgs {
            scope: scope(dir.path(), false),
        })
        .unwrap();
    }

    let conn = rusqlite::Connection::open(ledger_path(dir.path())).unwrap();
    assert_eq!(table_row_count(&conn, "normalize_log").unwrap(), Some(0));
}

#[test]
fn normalize_run_logs_a_changed_document() {
    let dir = parsed_root();
    let act = statute();
    let target = dir.path().join(&act.target);
    let mut document: Document = crate::util::read_json(&target).unwrap();
    document.sections[0].heading = "Short   title,\r\nextent and commencement.".to_string();
    crate::util::write_json_pretty(&target, &document).unwrap();

    normalize::run(NormalizeArgs {
        scope: scope(dir.path(), false),
    })
    .unwrap();

    let conn = rusqlite::Connection::open(ledger_path(dir.path())).unwrap();
    assert_eq!(table_row_count(&conn, "normalize_log").unwrap(), Some(1));
    let stored: Document = crate::util::read_json(&target).unwrap();
    assert_eq!(stored.sections[0].heading, "Short title, extent and commencement.");
}

#[test]
fn arrangement_check_reports_clean_and_divergent_lists() {
    let dir = parsed_root();
    let act = statute();
    let structured = dir.path().join(&act.target);

    let clean = write_file(dir.path(), "catalog/clean.txt", "1\n2\n3\n");
    let diff = check_act(dir.path(), &act, &clean, &structured, false, None).unwrap();
    assert!(diff.is_clean());
    assert_eq!(
        fs::read_to_string(snapshot_path(dir.path(), &act)).unwrap(),
        "1\n2\n3\n"
    );

    let divergent = write_file(dir.path(), "catalog/divergent.txt", "1\n3\n2\n4\n");
    let diff = check_act(dir.path(), &act, &divergent, &structured, false, None).unwrap();
    assert!(!diff.is_clean());
    assert_eq!(diff.missing, vec!["4".to_string()]);
    assert!(diff.extra.is_empty());
    assert_eq!(diff.order_mismatches[0].position, 1);
    assert_eq!(diff.order_mismatches[0].expected, "3");
    assert_eq!(diff.order_mismatches[0].found, "2");
}

#[test]
fn arrangement_check_records_a_ledger_row() {
    let dir = parsed_root();
    let act = statute();
    let structured = dir.path().join(&act.target);
    let canonical = write_file(dir.path(), "catalog/clean.txt", "1\n2\n3\n");

    let ledger = Ledger::open(dir.path(), "run-test").unwrap();
    check_act(dir.path(), &act, &canonical, &structured, false, Some(&ledger)).unwrap();

    let rows = table_row_count(ledger.connection(), "arrangement_log").unwrap();
    assert_eq!(rows, Some(1));
}

#[test]
fn alignment_writes_jsonl_and_reports_gaps() {
    let dir = parsed_root();
    let act = statute();
    let secondary = act.secondary.clone().unwrap();

    let result = align::align_act(
        dir.path(),
        &act,
        &secondary,
        SplitOptions::default(),
        false,
        false,
    )
    .unwrap();
    assert_eq!(result.gaps, vec!["2".to_string()]);
    assert_eq!(result.entries.len(), 2);

    let output = fs::read_to_string(dir.path().join(&secondary.output)).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["section_number"], "1");
    assert_eq!(first["secondary_language"], "hi");
    assert!(output.ends_with('\n'));
}

#[test]
fn catalog_run_writes_reverse_index_for_selected_acts() {
    let dir = parsed_root();
    let output = dir.path().join("catalog/reference_catalog.json");

    catalog::run(CatalogArgs {
        scope: scope(dir.path(), false),
        output: None,
    })
    .unwrap();

    let catalog: serde_json::Value =
        serde_json::from_slice(&fs::read(&output).unwrap()).unwrap();
    assert_eq!(catalog["acts"][0]["act_id"], "TEST-2024");
}

#[test]
fn catalog_run_fails_without_writing_when_an_act_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("catalog/reference_catalog.json");

    let err = catalog::run(CatalogArgs {
        scope: scope(dir.path(), false),
        output: None,
    })
    .unwrap_err();

    assert!(format!("{err}").contains("TEST-2024"));
    assert!(!output.exists());
}

#[test]
fn status_reads_documents_and_ledger_without_creating_it() {
    let dir = parsed_root();
    let acts_config = scope(dir.path(), false).acts_config;

    status::run(StatusArgs {
        data_root: dir.path().to_path_buf(),
        acts_config: acts_config.clone(),
    })
    .unwrap();
    assert!(!ledger_path(dir.path()).exists());

    drop(Ledger::open(dir.path(), "run-test").unwrap());
    status::run(StatusArgs {
        data_root: dir.path().to_path_buf(),
        acts_config,
    })
    .unwrap();

    let conn = rusqlite::Connection::open(ledger_path(dir.path())).unwrap();
    for table in LEDGER_TABLES {
        assert_eq!(table_row_count(&conn, table).unwrap(), Some(0));
    }
}

#[test]
fn batch_failures_name_every_failed_act() {
    let mut failures = BatchFailures::default();
    assert!(failures.is_empty());

    failures.record("A-1", &anyhow::anyhow!("boom"));
    failures.record("B-2", &anyhow::anyhow!("bang"));

    let message = format!("{}", failures.finish("parse").unwrap_err());
    assert_eq!(message, "parse failed for 2 act(s): A-1, B-2");
}

#[test]
fn relative_display_strips_the_data_root() {
    let root = Path::new("/srv/data");
    assert_eq!(
        display_relative(root, &root.join("processed/a.txt")),
        "processed/a.txt"
    );
    assert_eq!(display_relative(root, Path::new("/elsewhere/b.txt")), "/elsewhere/b.txt");
}
