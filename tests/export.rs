//! End-to-end export runs against an in-memory catalog.

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use catalog_export::{
    export_all, write_entry, CatalogEntry, CatalogSource, ErrorPolicy, ExportError, ExportOptions,
    ExportResult, ExportStatus, NullDefinitionPolicy, ObjectKind,
};

const HEADER: &str = "SET ANSI_NULLS ON\r\nGO\r\nSET QUOTED_IDENTIFIER ON\r\nGO\r\n";

/// Serves fixed rows per kind, in the order given, and counts queries.
#[derive(Default)]
struct StaticCatalog {
    rows: HashMap<ObjectKind, Vec<CatalogEntry>>,
    queries: Cell<usize>,
    fail_with: Option<fn() -> ExportError>,
}

impl StaticCatalog {
    fn with(kind: ObjectKind, rows: Vec<CatalogEntry>) -> Self {
        let mut catalog = Self::default();
        catalog.rows.insert(kind, rows);
        catalog
    }
}

impl CatalogSource for StaticCatalog {
    fn fetch_entries(&self, kind: ObjectKind) -> ExportResult<Vec<CatalogEntry>> {
        self.queries.set(self.queries.get() + 1);
        if let Some(make_err) = self.fail_with {
            return Err(make_err());
        }
        Ok(self.rows.get(&kind).cloned().unwrap_or_default())
    }
}

fn entry(schema: &str, name: &str, def: &str) -> CatalogEntry {
    CatalogEntry::new(schema, name, Some(def.to_string()))
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_get_total_function_scripted_exactly() {
    let def = "CREATE FUNCTION dbo.GetTotal() RETURNS INT AS BEGIN RETURN 1 END";
    let catalog = StaticCatalog::with(ObjectKind::Function, vec![entry("dbo", "GetTotal", def)]);
    let out = tempfile::tempdir().unwrap();

    let options = ExportOptions::new(out.path());
    let report = export_all(&catalog, ObjectKind::Function, &options).unwrap();

    assert_eq!(report.count(), 1);
    assert_eq!(report.status(), ExportStatus::Success);
    let bytes = fs::read(out.path().join("dbo.GetTotal.sql")).unwrap();
    let expected = format!("{HEADER}\r\n{def}\r\nGO");
    assert_eq!(bytes, expected.as_bytes());
}

#[test]
fn test_zero_rows_creates_empty_directory() {
    let catalog = StaticCatalog::default();
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("nested").join("ViewsExport");

    let report = export_all(&catalog, ObjectKind::View, &ExportOptions::new(&out)).unwrap();

    assert_eq!(report.count(), 0);
    assert!(out.is_dir());
    assert!(list_dir(&out).is_empty());
}

#[test]
fn test_existing_directory_is_fine() {
    let catalog = StaticCatalog::with(
        ObjectKind::View,
        vec![entry("dbo", "V", "CREATE VIEW V AS SELECT 1")],
    );
    let out = tempfile::tempdir().unwrap();
    fs::write(out.path().join("unrelated.txt"), "keep").unwrap();

    export_all(&catalog, ObjectKind::View, &ExportOptions::new(out.path())).unwrap();

    assert_eq!(list_dir(out.path()), vec!["dbo.V.sql", "unrelated.txt"]);
}

#[test]
fn test_unwritable_output_path_fails() {
    let catalog = StaticCatalog::with(ObjectKind::View, vec![entry("dbo", "V", "x")]);
    let root = tempfile::tempdir().unwrap();
    // a regular file where the directory should be
    let blocker = root.path().join("out");
    fs::write(&blocker, "not a dir").unwrap();

    let err = export_all(&catalog, ObjectKind::View, &ExportOptions::new(&blocker)).unwrap_err();

    assert!(matches!(err, ExportError::FileSystem { .. }));
    assert_eq!(catalog.queries.get(), 0);
}

#[test]
fn test_same_name_in_two_schemas() {
    let catalog = StaticCatalog::with(
        ObjectKind::StoredProcedure,
        vec![
            entry("dbo", "Load", "CREATE PROCEDURE dbo.Load AS SELECT 1"),
            entry("staging", "Load", "CREATE PROCEDURE staging.Load AS SELECT 2"),
        ],
    );
    let out = tempfile::tempdir().unwrap();

    let report =
        export_all(&catalog, ObjectKind::StoredProcedure, &ExportOptions::new(out.path())).unwrap();

    assert_eq!(report.count(), 2);
    assert_eq!(list_dir(out.path()), vec!["dbo.Load.sql", "staging.Load.sql"]);
    let staging = fs::read_to_string(out.path().join("staging.Load.sql")).unwrap();
    assert!(staging.contains("SELECT 2"));
}

#[test]
fn test_rerun_is_byte_identical() {
    let catalog = StaticCatalog::with(
        ObjectKind::View,
        vec![
            entry("dbo", "A", "CREATE VIEW dbo.A\r\nAS\r\nSELECT 1 AS One"),
            entry("dbo", "B", "CREATE VIEW dbo.B AS SELECT 2"),
        ],
    );
    let out = tempfile::tempdir().unwrap();
    let options = ExportOptions::new(out.path());

    export_all(&catalog, ObjectKind::View, &options).unwrap();
    let first: Vec<Vec<u8>> = ["dbo.A.sql", "dbo.B.sql"]
        .iter()
        .map(|f| fs::read(out.path().join(f)).unwrap())
        .collect();

    export_all(&catalog, ObjectKind::View, &options).unwrap();
    let second: Vec<Vec<u8>> = ["dbo.A.sql", "dbo.B.sql"]
        .iter()
        .map(|f| fs::read(out.path().join(f)).unwrap())
        .collect();

    assert_eq!(first, second);
    assert_eq!(catalog.queries.get(), 2);
}

#[test]
fn test_written_in_catalog_order() {
    let catalog = StaticCatalog::with(
        ObjectKind::Function,
        vec![
            entry("dbo", "Alpha", "a"),
            entry("dbo", "Beta", "b"),
            entry("sales", "Alpha", "c"),
        ],
    );
    let out = tempfile::tempdir().unwrap();

    let options = ExportOptions::new(out.path());
    let report = export_all(&catalog, ObjectKind::Function, &options).unwrap();

    let names: Vec<String> = report
        .written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["dbo.Alpha.sql", "dbo.Beta.sql", "sales.Alpha.sql"]);
}

#[test]
fn test_null_definition_skipped_by_default() {
    let catalog = StaticCatalog::with(
        ObjectKind::StoredProcedure,
        vec![
            CatalogEntry::new("dbo", "Encrypted", None),
            entry("dbo", "Plain", "CREATE PROCEDURE dbo.Plain AS SELECT 1"),
        ],
    );
    let out = tempfile::tempdir().unwrap();

    let report =
        export_all(&catalog, ObjectKind::StoredProcedure, &ExportOptions::new(out.path())).unwrap();

    assert_eq!(report.count(), 1);
    assert_eq!(report.skipped, vec!["dbo.Encrypted".to_string()]);
    assert_eq!(report.status(), ExportStatus::Success);
    assert_eq!(list_dir(out.path()), vec!["dbo.Plain.sql"]);
}

#[test]
fn test_null_definition_written_empty() {
    let catalog =
        StaticCatalog::with(ObjectKind::View, vec![CatalogEntry::new("dbo", "Enc", None)]);
    let out = tempfile::tempdir().unwrap();
    let options = ExportOptions {
        null_definitions: NullDefinitionPolicy::Empty,
        ..ExportOptions::new(out.path())
    };

    let report = export_all(&catalog, ObjectKind::View, &options).unwrap();

    assert_eq!(report.count(), 1);
    let text = fs::read_to_string(out.path().join("dbo.Enc.sql")).unwrap();
    assert_eq!(text, format!("{HEADER}\r\n\r\nGO"));
}

#[test]
fn test_null_definition_error_continues() {
    let catalog = StaticCatalog::with(
        ObjectKind::Function,
        vec![
            CatalogEntry::new("dbo", "Enc", None),
            entry("dbo", "Ok", "CREATE FUNCTION dbo.Ok() RETURNS INT AS BEGIN RETURN 1 END"),
        ],
    );
    let out = tempfile::tempdir().unwrap();
    let options = ExportOptions {
        null_definitions: NullDefinitionPolicy::Error,
        ..ExportOptions::new(out.path())
    };

    let report = export_all(&catalog, ObjectKind::Function, &options).unwrap();

    assert_eq!(report.status(), ExportStatus::PartialFailure);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].entry, "dbo.Enc");
    assert!(matches!(report.failures[0].error, ExportError::MissingDefinition { .. }));
    assert_eq!(list_dir(out.path()), vec!["dbo.Ok.sql"]);
}

#[test]
fn test_abort_policy_stops_at_first_failure() {
    let catalog = StaticCatalog::with(
        ObjectKind::View,
        vec![
            entry("dbo", "First", "CREATE VIEW dbo.First AS SELECT 1"),
            entry("dbo", "bad/name", "CREATE VIEW x AS SELECT 1"),
            entry("dbo", "Third", "CREATE VIEW dbo.Third AS SELECT 3"),
        ],
    );
    let out = tempfile::tempdir().unwrap();
    let options = ExportOptions {
        on_error: ErrorPolicy::Abort,
        ..ExportOptions::new(out.path())
    };

    let err = export_all(&catalog, ObjectKind::View, &options).unwrap_err();

    assert!(matches!(err, ExportError::FileSystem { .. }));
    // the entry before the failure stays on disk
    assert_eq!(list_dir(out.path()), vec!["dbo.First.sql"]);
}

#[test]
fn test_continue_policy_writes_the_rest() {
    let catalog = StaticCatalog::with(
        ObjectKind::View,
        vec![
            entry("dbo", "First", "CREATE VIEW dbo.First AS SELECT 1"),
            entry("dbo", "bad/name", "CREATE VIEW x AS SELECT 1"),
            entry("dbo", "Third", "CREATE VIEW dbo.Third AS SELECT 3"),
        ],
    );
    let out = tempfile::tempdir().unwrap();

    let report = export_all(&catalog, ObjectKind::View, &ExportOptions::new(out.path())).unwrap();

    assert_eq!(report.count(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].error.kind_name(), "FileSystemError");
    assert_eq!(list_dir(out.path()), vec!["dbo.First.sql", "dbo.Third.sql"]);
}

#[test]
fn test_query_failure_propagates() {
    let catalog = StaticCatalog {
        fail_with: Some(|| ExportError::Connection("login failed for user".into())),
        ..Default::default()
    };
    let out = tempfile::tempdir().unwrap();

    let options = ExportOptions::new(out.path());
    let err = export_all(&catalog, ObjectKind::Function, &options).unwrap_err();

    assert!(matches!(err, ExportError::Connection(_)));
    assert_eq!(err.kind_name(), "ConnectionError");
    // directory was still prepared before the query ran
    assert!(out.path().is_dir());
}

#[test]
fn test_write_entry_naming_is_deterministic() {
    let out = tempfile::tempdir().unwrap();
    let e = entry("hr", "Employees", "CREATE VIEW hr.Employees AS SELECT 1");

    let a = write_entry(&e, out.path()).unwrap();
    let b = write_entry(&e, out.path()).unwrap();

    assert_eq!(a, b);
    assert_eq!(a, out.path().join("hr.Employees.sql"));
}
