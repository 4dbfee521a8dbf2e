use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::catalog::{CatalogEntry, ObjectKind};
use crate::error::{ExportError, ExportResult};
use crate::script;
use crate::source::CatalogSource;

/// What to do with a module whose source the catalog does not return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullDefinitionPolicy {
    #[default]
    Skip,
    Empty,
    Error,
}

impl FromStr for NullDefinitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(NullDefinitionPolicy::Skip),
            "empty" => Ok(NullDefinitionPolicy::Empty),
            "error" => Ok(NullDefinitionPolicy::Error),
            other => Err(format!("unknown null-definition policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Record the failing entry and keep going.
    #[default]
    Continue,
    /// Stop at the first failing entry.
    Abort,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub on_error: ErrorPolicy,
    pub null_definitions: NullDefinitionPolicy,
}

impl ExportOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            on_error: ErrorPolicy::default(),
            null_definitions: NullDefinitionPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct EntryFailure {
    pub entry: String,
    pub error: ExportError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Success,
    PartialFailure,
}

/// Outcome of one `export_all` run over a single kind.
#[derive(Debug)]
pub struct ExportReport {
    pub kind: ObjectKind,
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<String>,
    pub failures: Vec<EntryFailure>,
}

impl ExportReport {
    fn new(kind: ObjectKind, output_dir: PathBuf) -> Self {
        Self {
            kind,
            output_dir,
            written: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Number of script files written.
    pub fn count(&self) -> usize {
        self.written.len()
    }

    pub fn status(&self) -> ExportStatus {
        if self.failures.is_empty() {
            ExportStatus::Success
        } else {
            ExportStatus::PartialFailure
        }
    }
}

/// Writes one entry as `{schema}.{object}.sql` inside `output_dir`, creating
/// the directory if needed and replacing any existing file. A missing
/// definition is written as empty.
pub fn write_entry(entry: &CatalogEntry, output_dir: &Path) -> ExportResult<PathBuf> {
    let file_name = entry.file_name();
    let path = output_dir.join(&file_name);
    check_file_name(&file_name).map_err(|e| ExportError::fs(&path, e))?;
    fs::create_dir_all(output_dir).map_err(|e| ExportError::fs(output_dir, e))?;

    let contents = script::compose(entry.definition.as_deref().unwrap_or(""));
    fs::write(&path, contents).map_err(|e| ExportError::fs(&path, e))?;
    Ok(path)
}

// Object names may legally contain characters that would turn the file
// name into a path; refuse those instead of writing outside `output_dir`.
fn check_file_name(name: &str) -> std::io::Result<()> {
    let bad = name.contains(['/', '\\', '\0'])
        || Path::new(name).file_name().map(|f| f != name).unwrap_or(true);
    if bad {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("'{name}' is not a valid file name"),
        ));
    }
    Ok(())
}

/// Creates the output directory, fetches every entry of `kind` and writes
/// them in catalog order.
///
/// Directory, connection and query failures end the run with `Err`.
/// Per-entry failures are collected in the report, or returned straight away
/// under [`ErrorPolicy::Abort`].
pub fn export_all<S>(
    source: &S,
    kind: ObjectKind,
    options: &ExportOptions,
) -> ExportResult<ExportReport>
where
    S: CatalogSource + ?Sized,
{
    let start = Instant::now();
    let dir = &options.output_dir;
    fs::create_dir_all(dir).map_err(|e| ExportError::fs(dir, e))?;

    let entries = source.fetch_entries(kind)?;
    info!("Exporting {} {} to {}", entries.len(), kind.noun(), dir.display());

    let mut report = ExportReport::new(kind, dir.clone());
    for entry in &entries {
        match export_entry(entry, options) {
            Ok(Some(path)) => {
                debug!("Scripted: {} -> {}", entry.qualified_name(), entry.file_name());
                report.written.push(path);
            }
            Ok(None) => {
                warn!("Skipped {}: definition is encrypted or NULL", entry.qualified_name());
                report.skipped.push(entry.qualified_name());
            }
            Err(e) => {
                error!("Failed {}: {}", entry.qualified_name(), e);
                if options.on_error == ErrorPolicy::Abort {
                    return Err(e);
                }
                report.failures.push(EntryFailure {
                    entry: entry.qualified_name(),
                    error: e,
                });
            }
        }
    }

    info!(
        "{} {} written, {} skipped, {} failed in {:.2?}",
        report.count(),
        kind.noun(),
        report.skipped.len(),
        report.failures.len(),
        start.elapsed()
    );
    Ok(report)
}

fn export_entry(entry: &CatalogEntry, options: &ExportOptions) -> ExportResult<Option<PathBuf>> {
    if entry.definition.is_none() {
        match options.null_definitions {
            NullDefinitionPolicy::Skip => return Ok(None),
            NullDefinitionPolicy::Error => {
                return Err(ExportError::MissingDefinition {
                    schema: entry.schema_name.clone(),
                    object: entry.object_name.clone(),
                })
            }
            NullDefinitionPolicy::Empty => {}
        }
    }
    write_entry(entry, &options.output_dir).map(Some)
}
