pub mod fs;

use thiserror::Error;

/// Errors from repository reads.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("io error on {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RepoError {
    /// Display text with the underlying I/O cause appended, for violation messages.
    pub fn describe(&self) -> String {
        match self {
            Self::NotFound(_) => self.to_string(),
            Self::Io { source, .. } => format!("{}: {}", self, source),
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;

/// Read-only view of the repository checkout under validation.
///
/// Paths are repository-relative and `/`-separated, exactly as they appear in
/// the diff listing.
pub trait RepoReader: Send + Sync {
    /// Read a file as UTF-8 text.
    fn read_to_string(&self, path: &str) -> Result<String>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Whether a regular file exists at `path`.
    fn is_file(&self, path: &str) -> bool;

    /// Names of the immediate subdirectories of `path`, sorted.
    fn list_dirs(&self, path: &str) -> Result<Vec<String>>;
}

/// Join repository-relative path fragments with `/`, skipping empty parts.
pub fn join_repo_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
