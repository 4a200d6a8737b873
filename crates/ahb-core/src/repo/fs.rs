use std::fs;
use std::path::{Path, PathBuf};

use super::{RepoError, RepoReader, Result};

/// Filesystem-backed repository view rooted at a checkout directory.
pub struct DiskRepo {
    root: PathBuf,
}

impl DiskRepo {
    /// Create a view rooted at `root`. The directory is not required to exist;
    /// every lookup under a missing root simply reports absence.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|p| !p.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl RepoReader for DiskRepo {
    fn read_to_string(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.resolve(path)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepoError::NotFound(path.to_string())
            } else {
                RepoError::Io {
                    path: path.to_string(),
                    source: e,
                }
            }
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn is_file(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn list_dirs(&self, path: &str) -> Result<Vec<String>> {
        let dir = self.resolve(path);
        let entries = fs::read_dir(&dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepoError::NotFound(path.to_string())
            } else {
                RepoError::Io {
                    path: path.to_string(),
                    source: e,
                }
            }
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RepoError::Io {
                path: path.to_string(),
                source: e,
            })?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
