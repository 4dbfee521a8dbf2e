// src/catalog.rs
use crate::error::{ExportError, ExportResult};

/// Column aliases every catalog query must produce, in this order.
pub const EXPECTED_COLUMNS: [&str; 3] = ["SchemaName", "ObjectName", "Definition"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Function,
    View,
    StoredProcedure,
}

struct KindInfo {
    kind: ObjectKind,
    noun: &'static str,
    folder: &'static str,
    query: &'static str,
}

// Indexed by `ObjectKind as usize`; keep in declaration order.
const KINDS: [KindInfo; 3] = [
    KindInfo {
        kind: ObjectKind::Function,
        noun: "functions",
        folder: "FunctionsExport",
        query: r#"
SELECT
    s.name AS SchemaName,
    o.name AS ObjectName,
    m.definition AS Definition
FROM sys.sql_modules m
INNER JOIN sys.objects o ON m.object_id = o.object_id
INNER JOIN sys.schemas s ON o.schema_id = s.schema_id
WHERE o.type IN ('FN', 'IF', 'TF')
ORDER BY SchemaName, ObjectName;
"#,
    },
    KindInfo {
        kind: ObjectKind::View,
        noun: "views",
        folder: "ViewsExport",
        query: r#"
SELECT
    s.name AS SchemaName,
    v.name AS ObjectName,
    m.definition AS Definition
FROM sys.views v
INNER JOIN sys.sql_modules m ON v.object_id = m.object_id
INNER JOIN sys.schemas s ON v.schema_id = s.schema_id
ORDER BY SchemaName, ObjectName;
"#,
    },
    KindInfo {
        kind: ObjectKind::StoredProcedure,
        noun: "stored procedures",
        folder: "StoredProceduresExport",
        query: r#"
SELECT
    SCHEMA_NAME(p.schema_id) AS SchemaName,
    p.name AS ObjectName,
    m.definition AS Definition
FROM sys.procedures p
INNER JOIN sys.sql_modules m ON p.object_id = m.object_id
ORDER BY SchemaName, ObjectName;
"#,
    },
];

impl ObjectKind {
    pub const ALL: [ObjectKind; 3] = [
        ObjectKind::Function,
        ObjectKind::View,
        ObjectKind::StoredProcedure,
    ];

    fn info(self) -> &'static KindInfo {
        let info = &KINDS[self as usize];
        debug_assert_eq!(info.kind, self);
        info
    }

    /// Read-only catalog query for this kind, ordered by schema then name.
    pub fn catalog_query(self) -> &'static str {
        self.info().query
    }

    pub fn noun(self) -> &'static str {
        self.info().noun
    }

    /// Folder name used when no explicit output directory is given,
    /// or when several kinds are exported in one run.
    pub fn default_folder(self) -> &'static str {
        self.info().folder
    }
}

/// One exportable module as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub schema_name: String,
    pub object_name: String,
    /// `None` for encrypted modules, whose source the catalog reports as NULL.
    pub definition: Option<String>,
}

impl CatalogEntry {
    pub fn new(
        schema_name: impl Into<String>,
        object_name: impl Into<String>,
        definition: Option<String>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            object_name: object_name.into(),
            definition: definition.filter(|d| !d.is_empty()),
        }
    }

    /// Build an entry from one raw result row. `row` is the 1-based row number,
    /// used only for error messages.
    pub fn from_row(
        row: usize,
        schema_name: Option<String>,
        object_name: Option<String>,
        definition: Option<String>,
    ) -> ExportResult<Self> {
        let schema_name = schema_name
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExportError::Query(format!("row {row}: SchemaName is NULL or empty")))?;
        let object_name = object_name
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExportError::Query(format!("row {row}: ObjectName is NULL or empty")))?;
        Ok(Self::new(schema_name, object_name, definition))
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.object_name)
    }

    /// `{schema}.{object}.sql`
    pub fn file_name(&self) -> String {
        format!("{}.{}.sql", self.schema_name, self.object_name)
    }
}
