//! Database file discovery
//!
//! Databases are the files in one directory whose extension is in the
//! configured list. A logical database name is a file's base name without its
//! extension and is matched case-insensitively.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{FbscopeError, Result};

/// A discovered database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseFile {
    /// Base name without extension
    pub name: String,
    pub file_name: String,
    pub path: PathBuf,
}

impl DatabaseFile {
    fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_stem()?.to_string_lossy().into_owned();
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            name,
            file_name,
            path,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseDirectory {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DatabaseDirectory {
    /// `extensions` are compared case-insensitively, without a leading dot.
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .map_or(false, |ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Candidate files sorted by path. A missing directory yields nothing.
    pub fn list_candidate_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "Database directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && self.accepts(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn list_databases(&self) -> Result<Vec<DatabaseFile>> {
        Ok(self
            .list_candidate_files()?
            .into_iter()
            .filter_map(DatabaseFile::from_path)
            .collect())
    }

    /// Resolve a logical name to its file.
    pub fn resolve(&self, name: &str) -> Result<DatabaseFile> {
        let wanted = name.to_lowercase();
        self.list_databases()?
            .into_iter()
            .find(|db| db.name.to_lowercase() == wanted)
            .ok_or_else(|| FbscopeError::DatabaseNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for f in files {
            std::fs::write(dir.path().join(f), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_lists_matching_files_sorted() {
        let dir = dir_with(&["b.FDB", "a.fdb", "notes.txt", "c.gdb"]);
        let d = DatabaseDirectory::new(dir.path(), &["fdb".to_string()]);
        let names: Vec<String> = d.list_databases().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let d = DatabaseDirectory::new("/definitely/not/here", &["fdb".to_string()]);
        assert!(d.list_candidate_files().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let dir = dir_with(&["Clinic.FDB"]);
        let d = DatabaseDirectory::new(dir.path(), &[".FDB".to_string()]);
        let db = d.resolve("CLINIC").unwrap();
        assert_eq!(db.file_name, "Clinic.FDB");
        assert_eq!(db.path, dir.path().join("Clinic.FDB"));

        let err = d.resolve("other").unwrap_err();
        assert!(matches!(err, FbscopeError::DatabaseNotFound(_)));
    }

    #[test]
    fn test_directories_are_skipped() {
        let dir = dir_with(&["a.fdb"]);
        std::fs::create_dir(dir.path().join("nested.fdb")).unwrap();
        let d = DatabaseDirectory::new(dir.path(), &["fdb".to_string()]);
        assert_eq!(d.list_candidate_files().unwrap().len(), 1);
    }
}
