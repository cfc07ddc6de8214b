//! Chassis Build - pipeline execution for the docs site
//!
//! Provides the build orchestrator that:
//! - Runs ordered command stages with preconditions
//! - Updates vendor assets with a fallback to submodule sync
//! - Relocates site output and validates the result

pub mod orchestrator;
pub mod pipeline;
pub mod stage;
pub mod vendor;

// Re-export key types
pub use orchestrator::{BuildReport, Operation, OperationReport, Orchestrator, ValidationReport};
pub use pipeline::{BuildPipeline, PipelineReport, Relocation, StageResult};
pub use stage::{BuildStage, Precondition};
pub use vendor::{VendorReport, VendorUpdate};
