//! AHB Core Library
//!
//! Building blocks for validating Awesome HA Blueprints contributions:
//! branch parsing, required-file resolution, JSON Schema validation,
//! cross-file integrity guardrails and contributor scope enforcement.

pub mod domain;
pub mod fakes;
pub mod integrity;
pub mod repo;
pub mod rules;
pub mod schema;
pub mod scope;
pub mod telemetry;

pub use domain::{
    normalize_version, parse_branch, AhbError, BranchError, BranchIdentity, BranchParse,
    BranchPrefix, Category, ChangedFileSet, Result, Role, ValidationVerdict, Violation,
    ViolationKind,
};

pub use integrity::{check_integrity, Guardrail, GuardrailSet};

pub use repo::fs::DiskRepo;
pub use repo::{join_repo_path, RepoError, RepoReader};

pub use rules::{
    expand_template, resolve_missing, MissingFiles, MissingStage, PlaceholderMode, RulesError,
    StageRequirement, StageRequirementRules, TreeLayout,
};

pub use schema::{classify, validate_changed_files, DocumentKind, SchemaError, SchemaRegistry};

pub use scope::enforce_scope;

pub use telemetry::{init_tracing, level_for_verbosity};
