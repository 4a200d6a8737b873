//! Domain-level error taxonomy for AHB validation.

use crate::domain::branch::BRANCH_SEGMENTS;
use crate::domain::verdict::{Violation, ViolationKind};
use crate::repo::RepoError;
use crate::rules::RulesError;
use crate::schema::SchemaError;

/// Errors produced while parsing a branch name.
///
/// Every variant is terminal for the run; the parser stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchError {
    #[error(
        "branch '{branch}' has {found} segments, expected {}: \
         {prefix}/<category>/<blueprint_id>/<library_id>/<release_id>/<YYYY.MM.DD>/author-<user>",
        BRANCH_SEGMENTS
    )]
    InvalidBranchFormat {
        branch: String,
        prefix: String,
        found: usize,
    },

    #[error("invalid category '{value}': expected one of controllers, hooks, automations")]
    InvalidCategory { value: String },

    #[error("invalid {segment} '{value}': {rule}")]
    InvalidIdentifierSegment {
        segment: &'static str,
        value: String,
        rule: &'static str,
    },

    #[error("invalid version '{value}': expected YYYY.MM.DD (optionally prefixed with 'v')")]
    InvalidVersion { value: String },

    #[error("invalid author '{value}': expected 'author-<user>'")]
    InvalidAuthor { value: String },
}

impl BranchError {
    /// Violation kind reported for this parse failure.
    pub fn kind(&self) -> ViolationKind {
        match self {
            Self::InvalidBranchFormat { .. } => ViolationKind::InvalidBranchFormat,
            Self::InvalidCategory { .. } => ViolationKind::InvalidCategory,
            Self::InvalidIdentifierSegment { .. } => ViolationKind::InvalidIdentifierSegment,
            Self::InvalidVersion { .. } => ViolationKind::InvalidVersion,
            Self::InvalidAuthor { .. } => ViolationKind::InvalidAuthor,
        }
    }
}

impl From<&BranchError> for Violation {
    fn from(err: &BranchError) -> Self {
        Violation::new(err.kind(), err.to_string())
    }
}

/// AHB domain errors.
///
/// These are infrastructure failures (unreadable inputs, broken rule or schema
/// files). Contribution problems are reported as [`Violation`]s instead.
/// Each variant displays as the wrapped error and shares its source chain.
#[derive(Debug, thiserror::Error)]
pub enum AhbError {
    #[error(transparent)]
    Branch(#[from] BranchError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Result type for AHB domain operations.
pub type Result<T> = std::result::Result<T, AhbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_error_display() {
        let err = BranchError::InvalidCategory {
            value: "scripts".to_string(),
        };
        assert!(err.to_string().contains("scripts"));
        assert!(err.to_string().contains("controllers"));

        let err = BranchError::InvalidBranchFormat {
            branch: "ahb_contrib/controllers".to_string(),
            prefix: "ahb_contrib".to_string(),
            found: 2,
        };
        assert!(err.to_string().contains("2 segments"));
        assert!(err.to_string().contains(&format!("expected {}", BRANCH_SEGMENTS)));
    }

    #[test]
    fn test_branch_error_maps_to_violation_kind() {
        let err = BranchError::InvalidVersion {
            value: "2024-01-01".to_string(),
        };
        let violation = Violation::from(&err);
        assert_eq!(violation.kind, ViolationKind::InvalidVersion);
        assert!(violation.file.is_none());
        assert!(violation.message.contains("2024-01-01"));
    }

    #[test]
    fn test_umbrella_error_wraps_branch_error() {
        let inner = BranchError::InvalidAuthor {
            value: "bob".to_string(),
        };
        let err: AhbError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
    }

    #[test]
    fn test_umbrella_error_names_cause_once() {
        use std::error::Error as _;

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let cause = source.to_string();
        let err: AhbError = RulesError::Json {
            path: "rules/hooks.json".to_string(),
            source,
        }
        .into();

        let mut chain = vec![err.to_string()];
        let mut next = err.source();
        while let Some(e) = next {
            chain.push(e.to_string());
            next = e.source();
        }
        let rendered = chain.join(": ");
        assert_eq!(rendered.matches(cause.as_str()).count(), 1, "{rendered}");
        assert!(rendered.starts_with("rule file rules/hooks.json is not valid JSON"));
    }
}
