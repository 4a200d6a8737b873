//! Integration tests for the validation pipeline over on-disk checkouts.

use std::fs;
use std::path::Path;

use ahb_ci::{
    PipelineOutcome, PipelineReport, PipelineStage, PipelineVariant, StageStatus,
    ValidationContext, ValidationPipeline, ValidationRequest, ValidatorConfig,
};
use ahb_core::{
    AhbError, ChangedFileSet, DiskRepo, PlaceholderMode, RulesError, SchemaError, ViolationKind,
};

const DOCS: &str = "website/docs/blueprints";

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn run_with(
    root: &Path,
    config: ValidatorConfig,
    branch: &str,
    files: &[&str],
) -> Result<PipelineOutcome, AhbError> {
    let config = ValidatorConfig {
        repo_root: root.to_path_buf(),
        ..config
    };
    let repo = DiskRepo::new(&config.repo_root);
    let ctx = ValidationContext {
        repo: &repo,
        config: &config,
    };
    let request = ValidationRequest::new(branch, ChangedFileSet::new(files.iter()));
    ValidationPipeline::run(&request, &ctx)
}

fn completed(outcome: PipelineOutcome) -> PipelineReport {
    match outcome {
        PipelineOutcome::Completed(report) => report,
        PipelineOutcome::Skipped { reason, .. } => panic!("unexpected skip: {reason}"),
    }
}

/// Automation blueprint with three dated versions.
fn seed_automation(root: &Path) {
    let base = format!("{DOCS}/automations/night_mode");
    write(root, &format!("{base}/blueprint.json"), r#"{"id":"night_mode","name":"Night mode","category":"automations"}"#);
    write(root, &format!("{base}/night_mode.md"), "---\ntitle: Night mode\n---\n");
    write(root, &format!("{base}/core/library.json"), r#"{"id":"core","name":"Core"}"#);
    write(root, &format!("{base}/core/stable/release.json"), r#"{"id":"stable","name":"Stable"}"#);
    for version in ["2024.01.01", "2024.06.01", "2025.01.01"] {
        let dir = format!("{base}/core/stable/{version}");
        write(root, &format!("{dir}/metadata.json"), &format!(r#"{{"id":"night_mode","version":"{version}"}}"#));
        write(root, &format!("{dir}/changelog.json"), r#"{"changes":[{"description":"update"}]}"#);
        write(root, &format!("{dir}/night_mode.yaml"), "blueprint:\n  name: Night mode\n");
    }
}

const AUTOMATION_BRANCH: &str = "ahb_contrib/automations/night_mode/core/stable/2025.01.01/author-dana";

/// Test: editing the newest version passes every stage
#[test]
fn test_latest_version_edit_passes() {
    let dir = tempfile::tempdir().unwrap();
    seed_automation(dir.path());

    let meta = format!("{DOCS}/automations/night_mode/core/stable/2025.01.01/metadata.json");
    let report = completed(
        run_with(dir.path(), ValidatorConfig::default(), AUTOMATION_BRANCH, &[meta.as_str()]).unwrap(),
    );

    assert!(report.passed(), "violations: {:?}", report.verdict.violations);
    assert_eq!(report.spec.variant, PipelineVariant::LibraryTree);
    assert!(report
        .stages
        .iter()
        .all(|s| s.status == StageStatus::Passed));
}

/// Test: editing an older version fails the semantic stage
#[test]
fn test_older_version_edit_fails_semantic_stage() {
    let dir = tempfile::tempdir().unwrap();
    seed_automation(dir.path());

    let meta = format!("{DOCS}/automations/night_mode/core/stable/2024.06.01/metadata.json");
    let report = completed(
        run_with(dir.path(), ValidatorConfig::default(), AUTOMATION_BRANCH, &[meta.as_str()]).unwrap(),
    );

    assert_eq!(report.failed_stage(), Some(PipelineStage::Semantic));
    assert!(report.verdict.has(ViolationKind::OutOfOrderVersionEdit));
    assert_eq!(
        report.stage(PipelineStage::RequiredFiles).map(|s| s.status),
        Some(StageStatus::NotRun)
    );
}

/// Test: breaking change must be documented in the changelog
#[test]
fn test_undocumented_breaking_change_fails() {
    let dir = tempfile::tempdir().unwrap();
    seed_automation(dir.path());
    let version = format!("{DOCS}/automations/night_mode/core/stable/2025.01.01");
    write(
        dir.path(),
        &format!("{version}/metadata.json"),
        r#"{"id":"night_mode","version":"2025.01.01","breaking":true}"#,
    );

    let meta = format!("{version}/metadata.json");
    let report = completed(
        run_with(dir.path(), ValidatorConfig::default(), AUTOMATION_BRANCH, &[meta.as_str()]).unwrap(),
    );
    assert!(report.verdict.has(ViolationKind::UndocumentedBreakingChange));

    write(
        dir.path(),
        &format!("{version}/changelog.json"),
        r#"{"changes":[{"description":"renamed input","breaking":true}]}"#,
    );
    let report = completed(
        run_with(dir.path(), ValidatorConfig::default(), AUTOMATION_BRANCH, &[meta.as_str()]).unwrap(),
    );
    assert!(report.passed(), "violations: {:?}", report.verdict.violations);
}

/// Test: legacy variant ignores version discipline
#[test]
fn test_legacy_variant_override_skips_version_discipline() {
    let dir = tempfile::tempdir().unwrap();
    seed_automation(dir.path());
    let config = ValidatorConfig {
        variant_override: Some(PipelineVariant::Legacy),
        ..ValidatorConfig::default()
    };

    let meta = format!("{DOCS}/automations/night_mode/core/stable/2024.06.01/metadata.json");
    let report = completed(run_with(dir.path(), config, AUTOMATION_BRANCH, &[meta.as_str()]).unwrap());

    assert_eq!(report.spec.variant, PipelineVariant::Legacy);
    assert!(!report.verdict.has(ViolationKind::OutOfOrderVersionEdit));
}

/// Test: identical inputs produce identical digests and verdicts
#[test]
fn test_runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    seed_automation(dir.path());
    let files = [
        "website/docs/blueprints/automations/night_mode/core/stable/2024.01.01/metadata.json",
        "website/docs/blueprints/automations/night_mode/night_mode.md",
    ];

    let first = completed(run_with(dir.path(), ValidatorConfig::default(), AUTOMATION_BRANCH, &files).unwrap());
    let second = completed(run_with(dir.path(), ValidatorConfig::default(), AUTOMATION_BRANCH, &files).unwrap());

    assert_eq!(first.spec.input_digest, second.spec.input_digest);
    assert_eq!(first.verdict, second.verdict);
    assert_eq!(first.stages, second.stages);
}

/// Test: custom rules directory with an unknown placeholder in strict mode
#[test]
fn test_strict_placeholders_surface_as_error() {
    let dir = tempfile::tempdir().unwrap();
    seed_automation(dir.path());
    let rules_dir = dir.path().join("rules");
    write(
        &rules_dir,
        "automations.json",
        r#"{"draft":["{category}/{blueprint_id}/{nickname}.json"]}"#,
    );

    let strict = ValidatorConfig {
        rules_dir: Some(rules_dir.clone()),
        placeholder_mode: PlaceholderMode::Strict,
        ..ValidatorConfig::default()
    };
    let err = run_with(dir.path(), strict, AUTOMATION_BRANCH, &[]).unwrap_err();
    assert!(matches!(
        err,
        AhbError::Rules(RulesError::UnknownPlaceholder { ref name, .. }) if name == "nickname"
    ));

    let lenient = ValidatorConfig {
        rules_dir: Some(rules_dir),
        ..ValidatorConfig::default()
    };
    let report = completed(run_with(dir.path(), lenient, AUTOMATION_BRANCH, &[]).unwrap());
    assert_eq!(report.failed_stage(), Some(PipelineStage::RequiredFiles));
    assert_eq!(
        report.verdict.violations[0].file.as_deref(),
        Some("website/docs/blueprints/automations/night_mode/.json")
    );
}

/// Test: a broken rule file is an infrastructure error
#[test]
fn test_malformed_rule_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let rules_dir = dir.path().join("rules");
    write(&rules_dir, "automations.json", "{ not json");

    let config = ValidatorConfig {
        rules_dir: Some(rules_dir),
        ..ValidatorConfig::default()
    };
    let err = run_with(dir.path(), config, AUTOMATION_BRANCH, &[]).unwrap_err();
    assert!(matches!(err, AhbError::Rules(RulesError::Json { .. })));
}

/// Test: custom schema directory replaces the built-in schemas
#[test]
fn test_schemas_dir_override() {
    let dir = tempfile::tempdir().unwrap();
    seed_automation(dir.path());
    let schemas = dir.path().join("schemas");
    write(
        &schemas,
        "docs.schema.json",
        r#"{"$id":"urn:test:docs","type":"object","required":["title","sidebar_position"]}"#,
    );

    let config = ValidatorConfig {
        schemas_dir: Some(schemas),
        ..ValidatorConfig::default()
    };
    let page = "website/docs/blueprints/automations/night_mode/night_mode.md";
    let report = completed(run_with(dir.path(), config, AUTOMATION_BRANCH, &[page]).unwrap());

    assert_eq!(report.failed_stage(), Some(PipelineStage::Schema));
    assert!(report.verdict.violations[0].message.contains("sidebar_position"));
}

/// Rules and schema directories that fail to load.
fn broken_config(root: &Path) -> ValidatorConfig {
    let rules_dir = root.join("rules");
    let schemas_dir = root.join("schemas");
    write(&rules_dir, "automations.json", "{ not json");
    write(&schemas_dir, "device.schema.json", "{");
    ValidatorConfig {
        rules_dir: Some(rules_dir),
        schemas_dir: Some(schemas_dir),
        ..ValidatorConfig::default()
    }
}

/// Test: unmanaged branches skip before rules or schemas are loaded
#[test]
fn test_unmanaged_branch_skips_despite_broken_rules_and_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let config = broken_config(dir.path());

    for branch in ["feature/docs-typo", "main", "ahbx_contrib/automations/x"] {
        let outcome = run_with(dir.path(), config.clone(), branch, &["README.md"]).unwrap();
        assert!(
            matches!(outcome, PipelineOutcome::Skipped { .. }),
            "expected skip for {branch}"
        );
        assert!(outcome.passed());
    }
}

/// Test: a broken schema file still fails a managed branch
#[test]
fn test_managed_branch_with_broken_schema_is_error() {
    let dir = tempfile::tempdir().unwrap();
    seed_automation(dir.path());
    let schemas_dir = dir.path().join("schemas");
    write(&schemas_dir, "device.schema.json", "{");

    let config = ValidatorConfig {
        schemas_dir: Some(schemas_dir),
        ..ValidatorConfig::default()
    };
    let err = run_with(dir.path(), config, AUTOMATION_BRANCH, &[]).unwrap_err();
    assert!(matches!(err, AhbError::Schema(SchemaError::Json { .. })));
}
