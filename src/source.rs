// src/source.rs
use log::{debug, info};
use odbc::{create_environment_v3, odbc_safe, Data, Environment, Statement, Version3};

use crate::catalog::{CatalogEntry, ObjectKind, EXPECTED_COLUMNS};
use crate::error::{ExportError, ExportResult};

/// Anything that can list the modules of one kind, ordered by schema then name.
pub trait CatalogSource {
    /// Runs the kind's catalog query and materializes every row.
    /// Calling again re-executes the query.
    fn fetch_entries(&self, kind: ObjectKind) -> ExportResult<Vec<CatalogEntry>>;
}

pub type OdbcEnvironment = Environment<Version3>;

pub fn create_environment() -> ExportResult<OdbcEnvironment> {
    create_environment_v3().map_err(|e| {
        ExportError::Connection(format!("failed to create ODBC environment: {:?}", e))
    })
}

/// Live SQL Server catalog reached over ODBC.
pub struct OdbcCatalog<'env> {
    conn: odbc::Connection<'env, odbc_safe::AutocommitOn>,
}

impl<'env> OdbcCatalog<'env> {
    pub fn connect(env: &'env OdbcEnvironment, connection_string: &str) -> ExportResult<Self> {
        let conn = env
            .connect_with_connection_string(connection_string)
            .map_err(|e| ExportError::Connection(format!("failed to connect: {}", e)))?;
        info!("Connected successfully");
        Ok(Self { conn })
    }
}

impl<'env> CatalogSource for OdbcCatalog<'env> {
    fn fetch_entries(&self, kind: ObjectKind) -> ExportResult<Vec<CatalogEntry>> {
        let stmt = Statement::with_parent(&self.conn).map_err(|e| {
            ExportError::Connection(format!("failed to allocate statement: {}", e))
        })?;

        debug!("Running catalog query for {}", kind.noun());
        let mut entries = Vec::new();

        match stmt.exec_direct(kind.catalog_query()).map_err(|e| {
            ExportError::Connection(format!("catalog query for {} failed: {}", kind.noun(), e))
        })? {
            Data(mut stmt) => {
                let ncols = stmt
                    .num_result_cols()
                    .map_err(|e| ExportError::Query(e.to_string()))?;
                let mut names = Vec::with_capacity(ncols.max(0) as usize);
                for idx in 1..=ncols.max(0) as u16 {
                    let desc = stmt
                        .describe_col(idx)
                        .map_err(|e| ExportError::Query(e.to_string()))?;
                    names.push(desc.name);
                }
                check_columns(&names)?;

                let fetch_err = |e: odbc::DiagnosticRecord| ExportError::Query(e.to_string());
                while let Some(mut cursor) = stmt.fetch().map_err(fetch_err)? {
                    let row = entries.len() + 1;
                    // SQL_C_WCHAR, so nothing passes through the client code page
                    let schema: Option<Vec<u16>> = cursor.get_data(1).map_err(fetch_err)?;
                    let object: Option<Vec<u16>> = cursor.get_data(2).map_err(fetch_err)?;
                    let definition: Option<Vec<u16>> = cursor.get_data(3).map_err(fetch_err)?;
                    entries.push(CatalogEntry::from_row(
                        row,
                        decode_wide(row, "SchemaName", schema)?,
                        decode_wide(row, "ObjectName", object)?,
                        decode_wide(row, "Definition", definition)?,
                    )?);
                }
            }
            _ => {
                return Err(ExportError::Query(format!(
                    "catalog query for {} returned no result set",
                    kind.noun()
                )))
            }
        }

        debug!("Fetched {} {}", entries.len(), kind.noun());
        Ok(entries)
    }
}

/// Converts one wide-character column value, rejecting unpaired surrogates.
pub fn decode_wide(
    row: usize,
    column: &str,
    value: Option<Vec<u16>>,
) -> ExportResult<Option<String>> {
    value
        .map(|units| {
            String::from_utf16(&units).map_err(|_| {
                ExportError::Query(format!("row {row}: {column} is not valid UTF-16"))
            })
        })
        .transpose()
}

/// Verifies the result set starts with `SchemaName, ObjectName, Definition`.
pub fn check_columns(names: &[String]) -> ExportResult<()> {
    if names.len() < EXPECTED_COLUMNS.len() {
        return Err(ExportError::Query(format!(
            "expected {} columns, got {}",
            EXPECTED_COLUMNS.len(),
            names.len()
        )));
    }
    for (got, want) in names.iter().zip(EXPECTED_COLUMNS) {
        if !got.eq_ignore_ascii_case(want) {
            return Err(ExportError::Query(format!(
                "expected column {want}, got {got}"
            )));
        }
    }
    Ok(())
}
