//! AHB contribution validator CLI
//!
//! The `ahb-validate` command gates pull requests against the blueprint
//! library conventions.
//!
//! ## Commands
//!
//! - `check`: Run the full validation pipeline for a branch and its diff
//! - `branch`: Parse a branch name and print its identity
//! - `required-files`: List files the branch's rule stages still miss
//! - `schema`: Validate explicit files against their JSON Schemas

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;

use ahb_ci::pipeline::DEFAULT_DOCS_ROOT;
use ahb_ci::{
    render_outcome, Channel, PipelineVariant, StatusLine, ValidationContext, ValidationPipeline,
    ValidationRequest, ValidatorConfig,
};
use ahb_core::{
    level_for_verbosity, parse_branch, resolve_missing, validate_changed_files, BranchError,
    BranchIdentity, BranchParse, Category, ChangedFileSet, DiskRepo, PlaceholderMode,
    StageRequirementRules, Violation,
};

#[derive(Parser)]
#[command(name = "ahb-validate")]
#[command(author = "AHB Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate blueprint contributions before merge", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Repository checkout root
    #[arg(long, global = true, env = "AHB_REPO_ROOT", default_value = ".")]
    repo_root: PathBuf,

    /// Blueprint tree root, relative to the repository root
    #[arg(long, global = true, env = "AHB_DOCS_ROOT", default_value = DEFAULT_DOCS_ROOT)]
    docs_root: String,

    /// Directory with `<category>.json` rule files (default: built-in rules)
    #[arg(long, global = true, env = "AHB_RULES_DIR")]
    rules_dir: Option<PathBuf>,

    /// Directory with `<kind>.schema.json` files (default: built-in schemas)
    #[arg(long, global = true, env = "AHB_SCHEMAS_DIR")]
    schemas_dir: Option<PathBuf>,

    /// Fail on unknown `{placeholders}` in rule templates
    #[arg(long, global = true, env = "AHB_STRICT_PLACEHOLDERS")]
    strict_placeholders: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full validation pipeline
    Check {
        /// Pull request branch name
        branch: String,

        /// Newline-separated list of changed files (default: no changes)
        diff_file: Option<PathBuf>,

        /// Force a tree variant instead of deriving it from the branch prefix
        #[arg(long, value_enum)]
        variant: Option<VariantArg>,

        /// Write the full run report as JSON to this path
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// Parse a branch name and print the identity as JSON
    Branch {
        /// Branch name to parse
        branch: String,
    },

    /// Check that every file required by the branch's rule stages exists
    RequiredFiles {
        /// Pull request branch name
        branch: String,

        /// Force a tree variant instead of deriving it from the branch prefix
        #[arg(long, value_enum)]
        variant: Option<VariantArg>,
    },

    /// Validate files against their JSON Schemas
    Schema {
        /// Repository-relative paths to validate
        #[arg(required = true)]
        files: Vec<String>,

        /// Only treat positional documents under this category as validatable
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    LibraryTree,
    Legacy,
}

impl From<VariantArg> for PipelineVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::LibraryTree => PipelineVariant::LibraryTree,
            VariantArg::Legacy => PipelineVariant::Legacy,
        }
    }
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse().map_err(|e: BranchError| e.to_string())
}

impl Cli {
    fn config(&self, variant: Option<VariantArg>) -> ValidatorConfig {
        ValidatorConfig {
            repo_root: self.repo_root.clone(),
            docs_root: self.docs_root.clone(),
            rules_dir: self.rules_dir.clone(),
            schemas_dir: self.schemas_dir.clone(),
            placeholder_mode: if self.strict_placeholders {
                PlaceholderMode::Strict
            } else {
                PlaceholderMode::Lenient
            },
            variant_override: variant.map(PipelineVariant::from),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    ahb_core::init_tracing(cli.json_logs, level_for_verbosity(cli.verbose));

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Execute the selected command; `Ok(false)` means validation failed.
fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Check {
            branch,
            diff_file,
            variant,
            report_json,
        } => cmd_check(
            &cli.config(*variant),
            branch,
            diff_file.as_deref(),
            report_json.as_deref(),
        ),
        Commands::Branch { branch } => cmd_branch(branch),
        Commands::RequiredFiles { branch, variant } => {
            cmd_required_files(&cli.config(*variant), branch)
        }
        Commands::Schema { files, category } => cmd_schema(&cli.config(None), files, *category),
    }
}

fn print_lines(lines: &[StatusLine]) {
    for line in lines {
        match line.channel {
            Channel::Stdout => println!("{}", line),
            Channel::Stderr => eprintln!("{}", line),
        }
    }
}

fn print_violations(header: &str, violations: &[Violation]) {
    eprintln!("❌ {}", header);
    for violation in violations {
        eprintln!("   - {}", violation);
    }
}

fn cmd_check(
    config: &ValidatorConfig,
    branch: &str,
    diff_file: Option<&Path>,
    report_json: Option<&Path>,
) -> Result<bool> {
    let files = match diff_file {
        Some(path) => {
            let listing = fs::read_to_string(path)
                .with_context(|| format!("Failed to read diff file {}", path.display()))?;
            ChangedFileSet::from_diff_listing(&listing)
        }
        None => ChangedFileSet::default(),
    };
    info!(branch = %branch, files = files.len(), "Loaded change set");

    let repo = DiskRepo::new(&config.repo_root);
    let ctx = ValidationContext {
        repo: &repo,
        config,
    };

    let request = ValidationRequest::new(branch, files);
    let outcome = ValidationPipeline::run(&request, &ctx).context("Validation pipeline failed")?;
    print_lines(&render_outcome(&outcome));

    if let Some(path) = report_json {
        let json = serde_json::to_string_pretty(&outcome)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote JSON report");
    }

    Ok(outcome.passed())
}

/// Parse `branch`; `Ok(None)` for skipped branches, `Err` for rejected names.
fn managed_identity(branch: &str) -> std::result::Result<Option<BranchIdentity>, BranchError> {
    match parse_branch(branch)? {
        BranchParse::Managed(identity) => Ok(Some(identity)),
        BranchParse::Skip { reason } => {
            println!("ℹ️  Skipping '{}': {}", branch, reason);
            Ok(None)
        }
    }
}

fn cmd_branch(branch: &str) -> Result<bool> {
    match managed_identity(branch) {
        Ok(Some(identity)) => {
            println!("{}", serde_json::to_string_pretty(&identity)?);
            Ok(true)
        }
        Ok(None) => Ok(true),
        Err(e) => {
            eprintln!("❌ {}", Violation::from(&e));
            Ok(false)
        }
    }
}

fn cmd_required_files(config: &ValidatorConfig, branch: &str) -> Result<bool> {
    let identity = match managed_identity(branch) {
        Ok(Some(identity)) => identity,
        Ok(None) => return Ok(true),
        Err(e) => {
            eprintln!("❌ {}", Violation::from(&e));
            return Ok(false);
        }
    };

    let variant = config
        .variant_override
        .unwrap_or_else(|| PipelineVariant::for_prefix(identity.prefix()));
    let rules = StageRequirementRules::load(
        identity.category(),
        config.rules_dir.as_deref(),
        variant.layout(),
    )
    .context("Failed to load required-files rules")?;

    let repo = DiskRepo::new(&config.repo_root);
    let missing = resolve_missing(
        &identity,
        &rules,
        &repo,
        &config.docs_root,
        config.placeholder_mode,
    )?;

    if missing.is_empty() {
        println!(
            "✅ All required files present under {}",
            identity.blueprint_prefix(&config.docs_root)
        );
        return Ok(true);
    }
    print_violations(
        &format!("{} required file(s) missing", missing.total()),
        &missing.to_violations(),
    );
    Ok(false)
}

fn cmd_schema(config: &ValidatorConfig, files: &[String], category: Option<Category>) -> Result<bool> {
    let registry = config.load_registry().context("Failed to load schemas")?;
    let repo = DiskRepo::new(&config.repo_root);
    let files = ChangedFileSet::new(files);

    let violations = validate_changed_files(&registry, &repo, &files, category);
    if violations.is_empty() {
        println!("✅ {} file(s) match their schemas", files.len());
        return Ok(true);
    }
    print_violations(
        &format!("{} schema violation(s)", violations.len()),
        &violations,
    );
    Ok(false)
}
