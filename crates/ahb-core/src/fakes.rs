//! In-memory fakes for repository access (testing only)
//!
//! Provides `MemoryRepo`, which satisfies the [`RepoReader`] contract without
//! touching the filesystem.

use std::collections::{BTreeMap, BTreeSet};

use crate::repo::{RepoError, RepoReader, Result};

/// In-memory repository backed by a `BTreeMap<path, contents>`.
///
/// Directories exist implicitly as ancestors of stored files.
#[derive(Debug, Default, Clone)]
pub struct MemoryRepo {
    files: BTreeMap<String, String>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file (builder style).
    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: &str, contents: &str) {
        self.files
            .insert(path.trim_matches('/').to_string(), contents.to_string());
    }

    fn dir_prefix(path: &str) -> String {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        }
    }
}

impl RepoReader for MemoryRepo {
    fn read_to_string(&self, path: &str) -> Result<String> {
        self.files
            .get(path.trim_matches('/'))
            .cloned()
            .ok_or_else(|| RepoError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        let prefix = Self::dir_prefix(path);
        self.is_file(path) || self.files.keys().any(|k| k.starts_with(&prefix))
    }

    fn is_file(&self, path: &str) -> bool {
        self.files.contains_key(path.trim_matches('/'))
    }

    fn list_dirs(&self, path: &str) -> Result<Vec<String>> {
        if !self.exists(path) {
            return Err(RepoError::NotFound(path.to_string()));
        }
        let prefix = Self::dir_prefix(path);
        let dirs: BTreeSet<String> = self
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once('/').map(|(dir, _)| dir.to_string()))
            .collect();
        Ok(dirs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_directories() {
        let repo = MemoryRepo::new()
            .with_file("a/b/2024.01.01/metadata.json", "{}")
            .with_file("a/b/2025.01.01/metadata.json", "{}")
            .with_file("a/b/notes.md", "");
        assert!(repo.exists("a/b"));
        assert!(repo.exists("a/b/"));
        assert!(!repo.is_file("a/b"));
        assert_eq!(
            repo.list_dirs("a/b").unwrap(),
            vec!["2024.01.01".to_string(), "2025.01.01".to_string()]
        );
    }

    #[test]
    fn prefix_is_not_a_directory() {
        let repo = MemoryRepo::new().with_file("abc/file.json", "{}");
        assert!(!repo.exists("ab"));
    }

    #[test]
    fn missing_file_not_found() {
        let repo = MemoryRepo::new();
        assert!(matches!(
            repo.read_to_string("x.json"),
            Err(RepoError::NotFound(_))
        ));
        assert!(repo.list_dirs("x").is_err());
    }
}
