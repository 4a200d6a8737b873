//! The ordered set of files changed by a pull request.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Repository-relative paths touched by a pull request.
///
/// The set is computed by the surrounding CI job; the validator only reads it.
/// Order is preserved, duplicates keep their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFileSet {
    paths: Vec<String>,
}

impl ChangedFileSet {
    /// Build a set from arbitrary path strings.
    ///
    /// Paths are trimmed, backslashes are normalized to `/`, a leading `./` is
    /// dropped and empty entries are ignored.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for raw in paths {
            let normalized = raw.as_ref().trim().replace('\\', "/");
            let normalized = normalized.strip_prefix("./").unwrap_or(&normalized);
            if normalized.is_empty() || !seen.insert(normalized.to_string()) {
                continue;
            }
            out.push(normalized.to_string());
        }
        Self { paths: out }
    }

    /// Parse the newline-separated diff listing produced by the CI job.
    pub fn from_diff_listing(listing: &str) -> Self {
        Self::new(listing.lines())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.paths
    }
}

impl<'a> IntoIterator for &'a ChangedFileSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}
