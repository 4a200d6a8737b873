//! AHB CI - pull request validation pipeline
//!
//! Provides the orchestrator that runs on every pull request:
//! - Parses the branch and dispatches on the contributor/maintainer role
//! - Runs scope, schema, integrity and required-file stages in order
//! - Produces a serializable report and human-readable status lines

pub mod pipeline;
pub mod report;
pub mod spec;
pub mod stage;

// Re-export key types
pub use pipeline::{
    PipelineOutcome, PipelineReport, ValidationContext, ValidationPipeline, ValidationRequest,
    ValidatorConfig,
};
pub use report::{render_outcome, Channel, StatusLine};
pub use spec::RunSpec;
pub use stage::{PipelineStage, PipelineVariant, StageResult, StageStatus};
