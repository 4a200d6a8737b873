//! Run inputs and their content digest.

use ahb_core::ChangedFileSet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::stage::PipelineVariant;

/// Inputs of one validation run.
///
/// Two runs over identical inputs share the same `input_digest`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSpec {
    /// Branch name as received.
    pub branch: String,

    /// Changed files in diff order.
    pub changed_files: Vec<String>,

    /// Variant the run validates against.
    pub variant: PipelineVariant,

    /// SHA-256 digest over branch, ordered files and variant.
    pub input_digest: String,
}

impl RunSpec {
    pub fn new(branch: &str, files: &ChangedFileSet, variant: PipelineVariant) -> Self {
        let changed_files = files.as_slice().to_vec();
        let input_digest = compute_input_digest(branch, &changed_files, variant);
        Self {
            branch: branch.to_string(),
            changed_files,
            variant,
            input_digest,
        }
    }

    /// First 12 hex characters of the digest, for log lines.
    pub fn short_digest(&self) -> &str {
        &self.input_digest[..12.min(self.input_digest.len())]
    }
}

/// Deterministic digest of the run inputs; order sensitive.
fn compute_input_digest(branch: &str, files: &[String], variant: PipelineVariant) -> String {
    let mut hasher = Sha256::new();
    hasher.update(branch.as_bytes());
    hasher.update(b"\0");
    for file in files {
        hasher.update(file.as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(variant.name().as_bytes());
    hex::encode(hasher.finalize())
}
