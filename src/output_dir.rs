use std::path::{Path, PathBuf};

use directories::UserDirs;

use crate::catalog::ObjectKind;

/// Base directory for a run.
///
/// A configured directory is used as is. Otherwise scripts land in
/// `<downloads>/<database>`, with the home directory and then the working
/// directory standing in when no downloads folder is known.
pub fn base_dir(configured: Option<&Path>, database: Option<&str>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    let mut dir = UserDirs::new()
        .map(|dirs| {
            dirs.download_dir()
                .unwrap_or_else(|| dirs.home_dir())
                .to_path_buf()
        })
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    if let Some(db) = database.filter(|d| !d.is_empty()) {
        dir.push(db);
    }
    dir
}

/// Where one kind's scripts go.
///
/// An explicit directory used for a single kind receives the files directly.
/// Otherwise each kind gets its own folder (`FunctionsExport`, ...) below the base.
pub fn kind_dir(base: &Path, kind: ObjectKind, explicit: bool, multiple_kinds: bool) -> PathBuf {
    if explicit && !multiple_kinds {
        base.to_path_buf()
    } else {
        base.join(kind.default_folder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_single_kind_uses_dir_as_is() {
        let base = Path::new("/exports");
        assert_eq!(
            kind_dir(base, ObjectKind::View, true, false),
            PathBuf::from("/exports")
        );
    }

    #[test]
    fn test_all_kinds_get_own_folder() {
        let base = Path::new("/exports");
        assert_eq!(
            kind_dir(base, ObjectKind::StoredProcedure, true, true),
            PathBuf::from("/exports/StoredProceduresExport")
        );
        assert_eq!(
            kind_dir(base, ObjectKind::Function, false, false),
            PathBuf::from("/exports/FunctionsExport")
        );
    }

    #[test]
    fn test_base_dir_prefers_configured() {
        let dir = base_dir(Some(Path::new("/out")), Some("mssql"));
        assert_eq!(dir, PathBuf::from("/out"));

        let dir = base_dir(None, Some("mssql"));
        assert!(dir.ends_with("mssql"));

        let dir = base_dir(None, Some(""));
        assert!(!dir.as_os_str().is_empty());
    }
}
