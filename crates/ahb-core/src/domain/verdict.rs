//! Violations and the accumulated verdict of a validation run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a contribution problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    InvalidBranchFormat,
    InvalidCategory,
    InvalidIdentifierSegment,
    InvalidVersion,
    InvalidAuthor,
    MissingRequiredFile,
    SchemaViolation,
    IdentityMismatch,
    VersionMismatch,
    OutOfOrderVersionEdit,
    UndocumentedBreakingChange,
    OutOfScopeFile,
}

impl ViolationKind {
    /// Stable name used in human-readable output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidBranchFormat => "InvalidBranchFormat",
            Self::InvalidCategory => "InvalidCategory",
            Self::InvalidIdentifierSegment => "InvalidIdentifierSegment",
            Self::InvalidVersion => "InvalidVersion",
            Self::InvalidAuthor => "InvalidAuthor",
            Self::MissingRequiredFile => "MissingRequiredFile",
            Self::SchemaViolation => "SchemaViolation",
            Self::IdentityMismatch => "IdentityMismatch",
            Self::VersionMismatch => "VersionMismatch",
            Self::OutOfOrderVersionEdit => "OutOfOrderVersionEdit",
            Self::UndocumentedBreakingChange => "UndocumentedBreakingChange",
            Self::OutOfScopeFile => "OutOfScopeFile",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Which rule was violated.
    pub kind: ViolationKind,
    /// Offending repository-relative path, when the violation is about a file.
    pub file: Option<String>,
    /// Human-readable explanation including the expected rule.
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: None,
            message: message.into(),
        }
    }

    pub fn for_file(kind: ViolationKind, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: Some(file.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{}] {}: {}", self.kind, file, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Accumulated outcome of one validation component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// Whether no violation was recorded.
    pub passed: bool,
    /// Violations in the order they were found (empty if passed).
    pub violations: Vec<Violation>,
}

impl ValidationVerdict {
    /// A passing verdict.
    pub fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    /// Build a verdict from accumulated violations.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }

    /// Number of recorded violations of `kind`.
    pub fn count_of(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    /// Whether at least one violation of `kind` was recorded.
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

impl From<Vec<Violation>> for ValidationVerdict {
    fn from(violations: Vec<Violation>) -> Self {
        Self::from_violations(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_violations_pass() {
        let verdict = ValidationVerdict::from_violations(vec![]);
        assert!(verdict.passed);
        assert_eq!(verdict, ValidationVerdict::pass());
    }

    #[test]
    fn test_violation_fails_verdict() {
        let verdict = ValidationVerdict::from_violations(vec![Violation::for_file(
            ViolationKind::IdentityMismatch,
            "library/controllers/acme/device.json",
            "device_id 'other' does not match folder 'acme'",
        )]);
        assert!(!verdict.passed);
        assert!(verdict.has(ViolationKind::IdentityMismatch));
        assert_eq!(verdict.count_of(ViolationKind::SchemaViolation), 0);
    }

    #[test]
    fn test_violation_display_names_file_and_kind() {
        let v = Violation::for_file(ViolationKind::OutOfScopeFile, "a/b.json", "outside prefix");
        assert_eq!(v.to_string(), "[OutOfScopeFile] a/b.json: outside prefix");

        let v = Violation::new(ViolationKind::InvalidCategory, "bad category");
        assert_eq!(v.to_string(), "[InvalidCategory] bad category");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ViolationKind::OutOfOrderVersionEdit).unwrap();
        assert_eq!(json, "\"out_of_order_version_edit\"");
    }
}
