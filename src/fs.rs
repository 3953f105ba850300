//! File system access
//!
//! Schema, mapping template and code files are the only inputs read from
//! disk. [`LocalFs`] reads the real file system, [`MemoryFs`] serves
//! fixtures for tests and dry runs.

use crate::error::{CompileError, Result};
use glob::{MatchOptions, Pattern};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn read_text(&self, path: &Path) -> Result<String>;

    /// Files matching `pattern`, in the order the glob engine yields them
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

/// Disk-backed file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let paths = glob::glob_with(pattern, MATCH_OPTIONS).map_err(|e| {
            CompileError::ConfigShape(format!("Invalid schema pattern '{}': {}", pattern, e))
        })?;

        let mut files = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().to_path_buf();
                    return Err(CompileError::Io {
                        path,
                        source: e.into(),
                    });
                }
            }
        }
        Ok(files)
    }
}

/// In-memory file system keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| CompileError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = Pattern::new(pattern).map_err(|e| {
            CompileError::ConfigShape(format!("Invalid schema pattern '{}': {}", pattern, e))
        })?;
        Ok(self
            .files
            .keys()
            .filter(|path| pattern.matches_path_with(path, MATCH_OPTIONS))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_glob_matches_in_path_order() {
        let fs = MemoryFs::new()
            .with_file("svc/schema/users.graphql", "type User { id: ID }")
            .with_file("svc/schema/posts.graphql", "type Post { id: ID }")
            .with_file("svc/other.graphql", "");

        let files = fs.glob("svc/schema/*.graphql").unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("svc/schema/posts.graphql"),
                PathBuf::from("svc/schema/users.graphql"),
            ]
        );
    }

    #[test]
    fn test_local_fs_reads_and_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schema.graphql"), "type Query { a: Int }").unwrap();

        let pattern = format!("{}/*.graphql", dir.path().display());
        let files = LocalFs.glob(&pattern).unwrap();
        assert_eq!(files.len(), 1);
        assert!(LocalFs.exists(&files[0]));
        assert_eq!(LocalFs.read_text(&files[0]).unwrap(), "type Query { a: Int }");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = MemoryFs::new().read_text(Path::new("nope.vtl")).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }
}
