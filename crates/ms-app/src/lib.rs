//! Shared application service layer for multistage sizing.
//!
//! Front ends go through this crate for configuration handling, runtime
//! compilation, optimization runs, and single-point evaluation.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod run_service;
pub mod runtime_compile;

pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{
    ProjectSummary, load_project, parse_overrides, save_project, summarize, validate_project,
};
pub use run_service::{
    EvaluationResponse, PayloadSweepResponse, RunRequest, RunResponse, RunTimingSummary, evaluate,
    run_optimize, run_optimize_with_progress, sweep_payload,
};
pub use runtime_compile::{
    SizingRuntime, build_stage, compile_constraints, compile_options, compile_project,
    compile_vehicle,
};
