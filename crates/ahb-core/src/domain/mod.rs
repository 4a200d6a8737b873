//! Domain models for AHB validation.
//!
//! Canonical definitions for the core entities:
//! - `BranchIdentity`: Typed identity parsed from a contribution branch
//! - `ChangedFileSet`: Files touched by the pull request
//! - `Violation` / `ValidationVerdict`: Accumulated rule failures

pub mod branch;
pub mod changes;
pub mod error;
pub mod verdict;

// Re-export main types and errors
pub use branch::{
    normalize_version, parse_branch, BranchIdentity, BranchParse, BranchPrefix, Category, Role,
    AUTHOR_PREFIX, BRANCH_SEGMENTS,
};
pub use changes::ChangedFileSet;
pub use error::{AhbError, BranchError, Result};
pub use verdict::{ValidationVerdict, Violation, ViolationKind};
