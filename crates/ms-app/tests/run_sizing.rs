//! End-to-end runs of the shipped demo configurations.

use std::path::{Path, PathBuf};

use ms_app::{
    AppError, RunProgressEvent, RunRequest, RunStage, compile_project, evaluate, load_project,
    parse_overrides, run_optimize, run_optimize_with_progress, save_project,
};
use ms_sizing::SizingOutcome;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

fn request(path: &Path) -> RunRequest<'_> {
    RunRequest {
        config_path: path,
        overrides: Vec::new(),
    }
}

#[test]
fn two_stage_demo_converges() {
    let path = demo("two_stage.yaml");
    let response = run_optimize(&request(&path)).expect("run should succeed");

    let SizingOutcome::Converged(solution) = &response.outcome else {
        panic!("expected convergence, got {:?}", response.outcome);
    };
    assert!((solution.snapshot.delta_v_sum_mps - 9000.0).abs() < 1.0);
    assert!(solution.constraints.iter().all(|c| c.value >= -1e-6));
    assert_eq!(response.summary.stage_count, 2);

    let report = response.report.expect("converged runs carry a report");
    assert_eq!(report.stage_labels, vec!["stage 1", "stage 2"]);
    assert!(response.timing.total_time_s >= response.timing.solve_time_s);
}

#[test]
fn three_stage_demo_converges() {
    let path = demo("three_stage.yaml");
    let response = run_optimize(&request(&path)).unwrap();
    let snapshot = response.outcome.snapshot().unwrap();
    assert!(response.outcome.is_converged());
    assert!((snapshot.delta_v_sum_mps - 9500.0).abs() < 1.0);
    assert!(snapshot.stages[2].structural_mass_kg >= 80.0 - 1e-3);
    assert!(snapshot.stages[0].acc_cutoff_g <= 10.0 + 1e-4);
}

#[test]
fn progress_events_cover_every_stage() {
    let path = demo("two_stage.yaml");
    let mut events: Vec<RunProgressEvent> = Vec::new();
    let response =
        run_optimize_with_progress(&request(&path), Some(&mut |e| events.push(e))).unwrap();

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&RunStage::LoadingConfig));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(stages.contains(&RunStage::Compiling));

    let steps = events.iter().filter(|e| e.iteration.is_some()).count();
    let SizingOutcome::Converged(solution) = &response.outcome else {
        panic!("expected convergence");
    };
    assert_eq!(steps, solution.iterations);
    assert!(
        events
            .windows(2)
            .all(|w| w[0].elapsed_wall_s <= w[1].elapsed_wall_s)
    );
}

#[test]
fn overrides_apply_before_validation() {
    let path = demo("two_stage.yaml");
    let overrides = parse_overrides(&["name=renamed".to_string()]).unwrap();
    let project = load_project(&path, &overrides).unwrap();
    assert_eq!(project.name, "renamed");

    let bad = parse_overrides(&["stages.1.structural_ratio=1.5".to_string()]).unwrap();
    assert!(matches!(
        load_project(&path, &bad),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn missing_config_is_reported() {
    let path = demo("does_not_exist.yaml");
    assert!(matches!(
        run_optimize(&request(&path)),
        Err(AppError::ConfigNotFound(_))
    ));
}

#[test]
fn saved_json_reloads_and_evaluates() {
    let project = load_project(&demo("two_stage.yaml"), &[]).unwrap();
    let out = std::env::temp_dir().join(format!("ms_app_{}.json", std::process::id()));
    save_project(&out, &project).unwrap();
    let reloaded = load_project(&out, &[]).unwrap();
    std::fs::remove_file(&out).ok();
    assert_eq!(reloaded, project);

    let runtime = compile_project(&reloaded).unwrap();
    let response = evaluate(&runtime, &[14_000.0, 2_200.0]).unwrap();
    assert_eq!(response.constraints.len(), 2);
    assert_eq!(response.snapshot.stages[1].propellant_kg, 2_200.0);
}
