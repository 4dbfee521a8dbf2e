
// src/lib.rs
// Library half of the exporter; the binary only adds CLI parsing and exit codes.
pub mod catalog;
pub mod config;
pub mod error;
pub mod exporter;
pub mod output_dir;
pub mod script;
pub mod source;

pub use catalog::{CatalogEntry, ObjectKind};
pub use error::{ExportError, ExportResult};
pub use exporter::{
    export_all, write_entry, ErrorPolicy, ExportOptions, ExportReport, ExportStatus,
    NullDefinitionPolicy,
};
pub use source::{CatalogSource, OdbcCatalog};
