//! Error types for catalog export.
//!
//! Fetching and writing return [`ExportError`] so the caller decides whether a
//! failure aborts the run or is only recorded against one entry.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// the database could not be reached, authenticated, or would not run the statement
    #[error("connection error: {0}")]
    Connection(String),

    /// the catalog query failed or returned an unexpected shape
    #[error("query error: {0}")]
    Query(String),

    /// output directory or script file could not be created or written
    #[error("file system error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// catalog returned no source text (encrypted module) and the policy forbids it
    #[error("no definition available for {schema}.{object} (encrypted or NULL)")]
    MissingDefinition { schema: String, object: String },

    /// configuration is incomplete or could not be parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl ExportError {
    pub fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExportError::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ExportError::Connection(_) => "ConnectionError",
            ExportError::Query(_) => "QueryError",
            ExportError::FileSystem { .. } => "FileSystemError",
            ExportError::MissingDefinition { .. } => "MissingDefinition",
            ExportError::Config(_) => "ConfigError",
        }
    }
}

pub type ExportResult<T> = Result<T, ExportError>;
