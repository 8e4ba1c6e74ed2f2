//! Sizing run execution and single-point evaluation.

use std::path::Path;
use std::time::Instant;

use ms_sizing::{ConstraintValue, SizingOutcome, evaluate_all, optimize_with_progress};
use ms_solver::SqpProgress;
use ms_vehicle::{PayloadPoint, Report, VehicleSnapshot, max_payload_for_delta_v, payload_sweep};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service::{self, ProjectSummary};
use crate::runtime_compile::{self, SizingRuntime};

/// Request to size the vehicle described by a configuration file.
pub struct RunRequest<'a> {
    pub config_path: &'a Path,
    /// `key=value` overrides applied before validation
    pub overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTimingSummary {
    pub load_time_s: f64,
    pub compile_time_s: f64,
    pub solve_time_s: f64,
    pub total_time_s: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub summary: ProjectSummary,
    pub outcome: SizingOutcome,
    /// Metric table of the converged vehicle, or of the last iterate when it resolves
    pub report: Option<Report>,
    pub timing: RunTimingSummary,
}

/// Vehicle resolved at a caller-chosen propellant split.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResponse {
    pub snapshot: VehicleSnapshot,
    pub report: Report,
    pub constraints: Vec<ConstraintValue>,
    pub delta_v_residual_mps: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadSweepResponse {
    pub points: Vec<PayloadPoint>,
    /// Heaviest payload still reaching the target; `None` if even zero payload falls short
    pub max_payload_kg: Option<f64>,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    iteration: Option<SqpProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            iteration,
        });
    }
}

/// Load, compile, and optimize.
pub fn run_optimize(request: &RunRequest) -> AppResult<RunResponse> {
    run_optimize_with_progress(request, None)
}

/// [`run_optimize`] streaming stage and per-iteration events.
pub fn run_optimize_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingConfig,
        started,
        Some(format!("Loading {}", request.config_path.display())),
        None,
    );
    let load_started = Instant::now();
    let project = project_service::load_project(request.config_path, &request.overrides)?;
    timing.load_time_s = load_started.elapsed().as_secs_f64();

    emit_progress(&mut progress_cb, RunStage::Compiling, started, None, None);
    let compile_started = Instant::now();
    let runtime = runtime_compile::compile_project(&project)?;
    timing.compile_time_s = compile_started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::Optimizing,
        started,
        Some(format!("{} stages", runtime.vehicle.num_stages())),
        None,
    );
    let solve_started = Instant::now();
    let outcome = {
        let mut on_step = |p: &SqpProgress| {
            emit_progress(&mut progress_cb, RunStage::Optimizing, started, None, Some(*p));
        };
        optimize_with_progress(
            &runtime.vehicle,
            &runtime.constraints,
            &runtime.options,
            Some(&mut on_step),
        )?
    };
    timing.solve_time_s = solve_started.elapsed().as_secs_f64();

    let report = outcome
        .snapshot()
        .map(|snapshot| Report::build(&runtime.vehicle, snapshot));
    timing.total_time_s = started.elapsed().as_secs_f64();

    info!(
        name = %project.name,
        converged = outcome.is_converged(),
        total_time_s = timing.total_time_s,
        "sizing run finished"
    );
    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(if outcome.is_converged() {
            "Converged".to_string()
        } else {
            "Stopped without convergence".to_string()
        }),
        None,
    );

    Ok(RunResponse {
        summary: project_service::summarize(&project),
        outcome,
        report,
        timing,
    })
}

/// Resolve the vehicle at `propellant_kg` without optimizing.
pub fn evaluate(runtime: &SizingRuntime, propellant_kg: &[f64]) -> AppResult<EvaluationResponse> {
    let snapshot = runtime.vehicle.resolve(propellant_kg)?;
    let constraints = evaluate_all(&runtime.constraints, &snapshot)?;
    let report = Report::build(&runtime.vehicle, &snapshot);
    debug!(
        liftoff_mass_kg = snapshot.initial_mass_kg(),
        delta_v_mps = snapshot.delta_v_sum_mps,
        "evaluated propellant split"
    );
    Ok(EvaluationResponse {
        delta_v_residual_mps: snapshot.delta_v_residual_mps(),
        snapshot,
        report,
        constraints,
    })
}

/// Total delta-v over `steps` evenly spaced payloads in `[from_kg, to_kg]`.
pub fn sweep_payload(
    runtime: &SizingRuntime,
    propellant_kg: &[f64],
    from_kg: f64,
    to_kg: f64,
    steps: usize,
) -> AppResult<PayloadSweepResponse> {
    if steps < 2 {
        return Err(AppError::InvalidInput(format!(
            "payload sweep needs at least 2 steps, got {steps}"
        )));
    }
    if !(from_kg.is_finite() && to_kg.is_finite() && from_kg <= to_kg) {
        return Err(AppError::InvalidInput(format!(
            "invalid payload range {from_kg}..{to_kg}"
        )));
    }

    let span = to_kg - from_kg;
    let payloads: Vec<f64> = (0..steps)
        .map(|i| from_kg + span * i as f64 / (steps - 1) as f64)
        .collect();
    let points = payload_sweep(&runtime.vehicle, propellant_kg, &payloads)?;
    let max_payload_kg = max_payload_for_delta_v(
        &runtime.vehicle,
        propellant_kg,
        runtime.vehicle.target_delta_v_mps(),
    )?;

    Ok(PayloadSweepResponse {
        points,
        max_payload_kg,
    })
}
