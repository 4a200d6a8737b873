//! Human-readable rendering of pipeline outcomes.
//!
//! Passing and informational lines go to stdout, failures to stderr.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineOutcome;
use crate::stage::StageStatus;

/// Output stream a line belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Stdout,
    Stderr,
}

/// One rendered status line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusLine {
    pub channel: Channel,
    pub text: String,
}

impl StatusLine {
    fn info(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Stdout,
            text: format!("ℹ️  {}", text.into()),
        }
    }

    fn pass(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Stdout,
            text: format!("✅ {}", text.into()),
        }
    }

    fn fail(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Stderr,
            text: format!("❌ {}", text.into()),
        }
    }

    fn detail(text: impl fmt::Display) -> Self {
        Self {
            channel: Channel::Stderr,
            text: format!("   - {}", text),
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render an outcome as status lines, in print order.
pub fn render_outcome(outcome: &PipelineOutcome) -> Vec<StatusLine> {
    let report = match outcome {
        PipelineOutcome::Skipped { branch, reason } => {
            return vec![StatusLine::info(format!(
                "Skipping validation for '{}': {}",
                branch, reason
            ))]
        }
        PipelineOutcome::Completed(report) => report,
    };

    let mut lines = Vec::new();
    for stage in &report.stages {
        let label = stage.stage.label();
        match stage.status {
            StageStatus::Passed => lines.push(StatusLine::pass(format!("{}: passed", label))),
            StageStatus::Skipped => {
                lines.push(StatusLine::info(format!("{}: skipped for maintainers", label)))
            }
            StageStatus::NotRun => lines.push(StatusLine::info(format!(
                "{}: not run after earlier failure",
                label
            ))),
            StageStatus::Failed => {
                lines.push(StatusLine::fail(format!(
                    "{}: {} violation(s)",
                    label,
                    stage.violations.len()
                )));
                lines.extend(stage.violations.iter().map(StatusLine::detail));
            }
        }
    }

    if report.passed() {
        lines.push(StatusLine::pass(format!(
            "Validation passed for '{}'",
            report.spec.branch
        )));
    } else {
        lines.push(StatusLine::fail(format!(
            "Validation failed for '{}' with {} violation(s)",
            report.spec.branch,
            report.verdict.violations.len()
        )));
    }
    lines
}
