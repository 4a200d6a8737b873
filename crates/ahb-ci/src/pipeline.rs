//! Validation pipeline orchestration.
//!
//! A run parses the branch, then executes the stages in order:
//! scope (contributors only), schema, integrity, required files.
//! The first failing stage ends the run; later stages are reported as not run.

use std::path::PathBuf;
use std::time::Instant;

use ahb_core::{
    check_integrity, enforce_scope, parse_branch, resolve_missing, validate_changed_files,
    AhbError, BranchIdentity, BranchParse, ChangedFileSet, PlaceholderMode, RepoReader, Role,
    SchemaRegistry, StageRequirementRules, ValidationVerdict, Violation,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::spec::RunSpec;
use crate::stage::{PipelineStage, PipelineVariant, StageResult};

/// Default location of the blueprint documentation tree, relative to the repo root.
pub const DEFAULT_DOCS_ROOT: &str = "website/docs/blueprints";

/// Validator settings, usually filled from CLI flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Checkout root; changed-file paths are relative to it.
    pub repo_root: PathBuf,

    /// Blueprint tree root, relative to `repo_root`.
    pub docs_root: String,

    /// Directory of `<category>.json` rule files; built-in rules when `None`.
    pub rules_dir: Option<PathBuf>,

    /// Directory of `<kind>.schema.json` files; built-in schemas when `None`.
    pub schemas_dir: Option<PathBuf>,

    pub placeholder_mode: PlaceholderMode,

    /// Force a variant instead of deriving it from the branch prefix.
    pub variant_override: Option<PipelineVariant>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("."),
            docs_root: DEFAULT_DOCS_ROOT.to_string(),
            rules_dir: None,
            schemas_dir: None,
            placeholder_mode: PlaceholderMode::default(),
            variant_override: None,
        }
    }
}

impl ValidatorConfig {
    /// Build the schema registry for this configuration.
    pub fn load_registry(&self) -> Result<SchemaRegistry, AhbError> {
        let registry = match &self.schemas_dir {
            Some(dir) => SchemaRegistry::load_dir(dir)?,
            None => SchemaRegistry::builtin()?,
        };
        info!(schemas = registry.len(), "Schema registry ready");
        Ok(registry)
    }

    /// Variant for `branch`, honouring the override.
    pub fn variant_for(&self, branch: &str) -> PipelineVariant {
        self.variant_override
            .unwrap_or_else(|| PipelineVariant::for_branch(branch))
    }
}

/// What to validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub branch: String,
    pub files: ChangedFileSet,
}

impl ValidationRequest {
    pub fn new(branch: impl Into<String>, files: ChangedFileSet) -> Self {
        Self {
            branch: branch.into(),
            files,
        }
    }
}

/// Everything a run reads from, built once by the caller.
///
/// Rule files and schemas named by `config` are loaded only once the branch
/// is known to be managed.
pub struct ValidationContext<'a> {
    pub repo: &'a dyn RepoReader,
    pub config: &'a ValidatorConfig,
}

/// Report of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Inputs and their digest.
    pub spec: RunSpec,

    /// Parsed identity; `None` when the branch name was rejected.
    pub identity: Option<BranchIdentity>,

    /// One entry per stage, in execution order.
    pub stages: Vec<StageResult>,

    /// Aggregated verdict over all stages.
    pub verdict: ValidationVerdict,

    pub started_at: DateTime<Utc>,

    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn passed(&self) -> bool {
        self.verdict.passed
    }

    /// The stage that ended the run, if any.
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        self.stages.iter().find(|s| s.failed()).map(|s| s.stage)
    }

    pub fn stage(&self, stage: PipelineStage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Result of running the pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Branch is not managed by the validator; treated as success.
    Skipped { branch: String, reason: String },

    /// All applicable stages ran, or one failed.
    Completed(PipelineReport),
}

impl PipelineOutcome {
    /// Success for both skipped and passing runs.
    pub fn passed(&self) -> bool {
        match self {
            PipelineOutcome::Skipped { .. } => true,
            PipelineOutcome::Completed(report) => report.passed(),
        }
    }
}

/// Pipeline orchestrator.
pub struct ValidationPipeline;

impl ValidationPipeline {
    /// Validate one pull request.
    ///
    /// Contribution problems end up in the report. Broken rule or schema files
    /// and unreadable inputs are returned as errors, but only for managed
    /// branches: an unmanaged branch is skipped before either is loaded.
    pub fn run(
        request: &ValidationRequest,
        ctx: &ValidationContext<'_>,
    ) -> Result<PipelineOutcome, AhbError> {
        let start = Instant::now();
        let started_at = Utc::now();
        let config = ctx.config;
        let spec = RunSpec::new(
            &request.branch,
            &request.files,
            config.variant_for(&request.branch),
        );

        info!(
            branch = %request.branch,
            files = request.files.len(),
            variant = %spec.variant,
            digest = %spec.short_digest(),
            "Starting validation pipeline"
        );

        let mut stages = Vec::with_capacity(PipelineStage::ALL.len());
        let finish = |stages: Vec<StageResult>, identity: Option<BranchIdentity>| {
            let violations: Vec<Violation> = stages
                .iter()
                .flat_map(|s| s.violations.iter().cloned())
                .collect();
            let verdict = ValidationVerdict::from_violations(violations);
            info!(
                passed = verdict.passed,
                violations = verdict.violations.len(),
                "Validation pipeline finished"
            );
            PipelineOutcome::Completed(PipelineReport {
                spec: spec.clone(),
                identity,
                stages,
                verdict,
                started_at,
                duration_ms: start.elapsed().as_millis() as u64,
            })
        };

        let identity = match parse_branch(&request.branch) {
            Ok(BranchParse::Managed(identity)) => identity,
            Ok(BranchParse::Skip { reason }) => {
                info!(branch = %request.branch, %reason, "Branch not managed, skipping");
                return Ok(PipelineOutcome::Skipped {
                    branch: request.branch.clone(),
                    reason,
                });
            }
            Err(e) => {
                warn!(branch = %request.branch, error = %e, "Branch name rejected");
                stages.push(StageResult::from_violations(
                    PipelineStage::ParseBranch,
                    vec![Violation::from(&e)],
                ));
                fill_not_run(&mut stages);
                return Ok(finish(stages, None));
            }
        };
        stages.push(StageResult::from_violations(PipelineStage::ParseBranch, Vec::new()));

        let rules = StageRequirementRules::load(
            identity.category(),
            config.rules_dir.as_deref(),
            spec.variant.layout(),
        )?;
        let registry = config.load_registry()?;

        for stage in [
            PipelineStage::Scope,
            PipelineStage::Schema,
            PipelineStage::Semantic,
            PipelineStage::RequiredFiles,
        ] {
            let result = match stage {
                PipelineStage::Scope if identity.role() == Role::Maintainer => {
                    StageResult::skipped(stage)
                }
                PipelineStage::Scope => {
                    let violations = enforce_scope(&identity, &request.files, &config.docs_root)
                        .err()
                        .into_iter()
                        .collect();
                    StageResult::from_violations(stage, violations)
                }
                PipelineStage::Schema => StageResult::from_violations(
                    stage,
                    validate_changed_files(
                        &registry,
                        ctx.repo,
                        &request.files,
                        Some(identity.category()),
                    ),
                ),
                PipelineStage::Semantic => StageResult::from_violations(
                    stage,
                    check_integrity(ctx.repo, &request.files, &spec.variant.guardrails()),
                ),
                PipelineStage::RequiredFiles => {
                    let missing = resolve_missing(
                        &identity,
                        &rules,
                        ctx.repo,
                        &config.docs_root,
                        config.placeholder_mode,
                    )?;
                    StageResult::from_violations(stage, missing.to_violations())
                }
                PipelineStage::ParseBranch => continue,
            };

            info!(
                stage = %stage,
                status = ?result.status,
                violations = result.violations.len(),
                "Stage finished"
            );
            let failed = result.failed();
            stages.push(result);
            if failed {
                fill_not_run(&mut stages);
                break;
            }
        }

        Ok(finish(stages, Some(identity)))
    }
}

/// Append `NotRun` entries for every stage not yet present.
fn fill_not_run(stages: &mut Vec<StageResult>) {
    for stage in PipelineStage::ALL {
        if !stages.iter().any(|s| s.stage == stage) {
            stages.push(StageResult::not_run(stage));
        }
    }
}
