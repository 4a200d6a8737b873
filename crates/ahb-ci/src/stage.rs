//! Pipeline stage definitions and variant profiles.

use std::fmt;
use std::str::FromStr;

use ahb_core::{BranchPrefix, GuardrailSet, TreeLayout, Violation};
use serde::{Deserialize, Serialize};

/// Stages of a validation run, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Parse the branch name into an identity.
    ParseBranch,

    /// Contributor files stay inside their blueprint folder.
    Scope,

    /// Changed documents validate against their JSON Schemas.
    Schema,

    /// Cross-file integrity guardrails.
    Semantic,

    /// Every file required by the rule stages exists.
    RequiredFiles,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 5] = [
        Self::ParseBranch,
        Self::Scope,
        Self::Schema,
        Self::Semantic,
        Self::RequiredFiles,
    ];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::ParseBranch => "parse_branch",
            PipelineStage::Scope => "scope",
            PipelineStage::Schema => "schema",
            PipelineStage::Semantic => "semantic",
            PipelineStage::RequiredFiles => "required_files",
        }
    }

    /// Short label used in status lines.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::ParseBranch => "Branch name",
            PipelineStage::Scope => "Contributor scope",
            PipelineStage::Schema => "Schema validation",
            PipelineStage::Semantic => "Integrity checks",
            PipelineStage::RequiredFiles => "Required files",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which tree conventions a run validates against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineVariant {
    /// Library Tree v2.0: every guardrail, dated version folders.
    #[default]
    LibraryTree,

    /// Legacy `ahb/` tree: `v`-prefixed versions, no version discipline or
    /// breaking-change enforcement.
    Legacy,
}

impl PipelineVariant {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineVariant::LibraryTree => "library-tree",
            PipelineVariant::Legacy => "legacy",
        }
    }

    /// Guardrails enabled for this variant.
    pub fn guardrails(&self) -> GuardrailSet {
        match self {
            PipelineVariant::LibraryTree => GuardrailSet::all(),
            PipelineVariant::Legacy => GuardrailSet::legacy(),
        }
    }

    /// Rule-file layout for this variant.
    pub fn layout(&self) -> TreeLayout {
        match self {
            PipelineVariant::LibraryTree => TreeLayout::LibraryTree,
            PipelineVariant::Legacy => TreeLayout::Legacy,
        }
    }

    pub fn for_prefix(prefix: BranchPrefix) -> Self {
        match prefix {
            BranchPrefix::Legacy => PipelineVariant::Legacy,
            BranchPrefix::Contrib | BranchPrefix::Maintain => PipelineVariant::LibraryTree,
        }
    }

    /// Default variant for a raw branch name, decided by its first segment.
    pub fn for_branch(branch: &str) -> Self {
        branch
            .split('/')
            .next()
            .and_then(BranchPrefix::from_segment)
            .map(Self::for_prefix)
            .unwrap_or_default()
    }
}

impl fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "library-tree" | "library_tree" => Ok(PipelineVariant::LibraryTree),
            "legacy" => Ok(PipelineVariant::Legacy),
            other => Err(format!(
                "unknown variant '{}': expected library-tree or legacy",
                other
            )),
        }
    }
}

/// Status of one stage in a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Passed,
    Failed,
    /// Not applicable to this branch (scope for maintainers).
    Skipped,
    /// An earlier stage failed.
    NotRun,
}

/// Result of one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageResult {
    pub stage: PipelineStage,
    pub status: StageStatus,
    pub violations: Vec<Violation>,
}

impl StageResult {
    /// Passed when no violation was found, failed otherwise.
    pub fn from_violations(stage: PipelineStage, violations: Vec<Violation>) -> Self {
        let status = if violations.is_empty() {
            StageStatus::Passed
        } else {
            StageStatus::Failed
        };
        Self {
            stage,
            status,
            violations,
        }
    }

    pub fn skipped(stage: PipelineStage) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            violations: Vec::new(),
        }
    }

    pub fn not_run(stage: PipelineStage) -> Self {
        Self {
            stage,
            status: StageStatus::NotRun,
            violations: Vec::new(),
        }
    }

    pub fn failed(&self) -> bool {
        self.status == StageStatus::Failed
    }
}
