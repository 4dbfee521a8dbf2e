// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ExportError, ExportResult};

pub const CONFIG_FILE_NAME: &str = "catalog-export.toml";
pub const DEFAULT_DRIVER: &str = "ODBC Driver 17 for SQL Server";

/// Settings as they appear in `catalog-export.toml`. Every field is optional;
/// command-line flags and environment variables fill or override them.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<String>,
    pub database: Option<String>,
    pub driver: Option<String>,
    pub trusted_connection: Option<bool>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connection_string: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Reads `path`. A missing file yields the defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> ExportResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            ExportError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ExportError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        // editors on Windows like to prepend a BOM
        toml::from_str(content.trim_start_matches('\u{FEFF}'))
    }

    /// Config file next to the executable, like the rest of the tool's data.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Fields set in `overrides` win over the ones read from the file.
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        FileConfig {
            server: overrides.server.or(self.server),
            database: overrides.database.or(self.database),
            driver: overrides.driver.or(self.driver),
            trusted_connection: overrides.trusted_connection.or(self.trusted_connection),
            user: overrides.user.or(self.user),
            password: overrides.password.or(self.password),
            connection_string: overrides.connection_string.or(self.connection_string),
            output_dir: overrides.output_dir.or(self.output_dir),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    /// Windows integrated security.
    Trusted,
    Credentials { user: String, password: String },
}

/// Fully resolved connection settings handed to the exporter.
#[derive(Debug, Clone)]
pub struct Config {
    pub connection_string: String,
    /// Database name, when known; used for the default output folder.
    pub database: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn resolve(file: FileConfig) -> ExportResult<Self> {
        let output_dir = file.output_dir.clone();

        if let Some(cs) = file.connection_string.filter(|s| !s.trim().is_empty()) {
            return Ok(Config {
                connection_string: cs,
                database: file.database,
                output_dir,
            });
        }

        let server = file
            .server
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExportError::Config("no server configured (use --server)".into()))?;
        let database = file
            .database
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExportError::Config("no database configured (use --database)".into()))?;

        let auth = match (file.user, file.trusted_connection) {
            (Some(user), Some(false)) | (Some(user), None) => Auth::Credentials {
                user,
                password: file.password.unwrap_or_default(),
            },
            (None, Some(false)) => {
                return Err(ExportError::Config(
                    "trusted_connection = false requires a user".into(),
                ))
            }
            (_, Some(true)) | (None, None) => Auth::Trusted,
        };

        let driver = file.driver.unwrap_or_else(|| DEFAULT_DRIVER.to_string());
        Ok(Config {
            connection_string: build_connection_string(&driver, &server, &database, &auth),
            database: Some(database),
            output_dir,
        })
    }

    /// Connection string with the `PWD`/`Password` value masked, safe to log.
    /// Brace-quoted values are skipped as a whole, so a `;` inside one does
    /// not leak the rest of the secret.
    pub fn redacted_connection_string(&self) -> String {
        split_attributes(&self.connection_string)
            .into_iter()
            .map(|(key, value)| {
                let k = key.trim();
                if k.eq_ignore_ascii_case("pwd") || k.eq_ignore_ascii_case("password") {
                    format!("{key}=***")
                } else {
                    match value {
                        Some(v) => format!("{key}={v}"),
                        None => key.to_string(),
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Splits `k=v;k={v;w}};...` into attributes, keeping brace-quoted values intact.
fn split_attributes(cs: &str) -> Vec<(&str, Option<&str>)> {
    let mut attrs = Vec::new();
    let mut rest = cs;
    while !rest.is_empty() {
        let Some((key, after)) = rest.split_once('=') else {
            attrs.push((rest, None));
            break;
        };
        let end = if after.starts_with('{') {
            closing_brace(after).map(|i| i + 1).unwrap_or(after.len())
        } else {
            after.find(';').unwrap_or(after.len())
        };
        let (value, tail) = after.split_at(end);
        attrs.push((key, Some(value)));
        // a trailing `;` becomes an empty attribute so joining restores it
        if tail == ";" {
            attrs.push(("", None));
        }
        rest = tail.strip_prefix(';').unwrap_or(tail);
    }
    attrs
}

// Index of the `}` closing a value that starts with `{`; `}}` is an escaped brace.
fn closing_brace(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'}' {
            if bytes.get(i + 1) == Some(&b'}') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

pub fn build_connection_string(driver: &str, server: &str, database: &str, auth: &Auth) -> String {
    let mut cs = format!(
        "Driver={};Server={};Database={};",
        braced(driver),
        quote_value(server),
        quote_value(database)
    );
    match auth {
        Auth::Trusted => cs.push_str("Trusted_Connection=yes;"),
        Auth::Credentials { user, password } => {
            cs.push_str(&format!("UID={};PWD={};", quote_value(user), quote_value(password)));
        }
    }
    cs
}

fn braced(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

/// ODBC attribute values containing `;`, `{` or `}` must be brace-quoted.
fn quote_value(value: &str) -> String {
    if value.contains([';', '{', '}']) || value.starts_with(' ') || value.ends_with(' ') {
        braced(value)
    } else {
        value.to_string()
    }
}
