//! Integration tests for the top-down vehicle resolve pass.

use ms_core::units::constants::G0_MPS2;
use ms_core::units::{kg, kmps, kn, mps, s};
use ms_vehicle::{Report, StageConfig, StageModel, Vehicle, VehicleError};

#[test]
fn two_stage_upper_mass_ordering() {
    let payload = 200.0;
    let bottom = StageConfig::new(0.9, s(290.0), kn(120.0)).with_engine_count(3);
    let top = StageConfig::new(0.85, s(330.0), kn(30.0));
    let vehicle = Vehicle::new("ordering", vec![bottom, top], kg(payload), kmps(8.0)).unwrap();

    let snap = vehicle.resolve(&[9_000.0, 1_200.0]).unwrap();

    assert_eq!(snap.stages[1].upper_mass_kg, payload);
    assert_eq!(snap.stages[0].upper_mass_kg, snap.stages[1].ignition_mass_kg);
}

#[test]
fn three_stage_chain_matches_manual_resolution() {
    let configs = vec![
        StageConfig::new(0.92, s(290.0), kn(500.0)).with_engine_count(5),
        StageConfig::new(0.9, s(310.0), kn(100.0)).with_consumption_pct(99.0),
        StageConfig::new(0.85, s(330.0), kn(10.0)).with_jettison(kg(50.0)),
    ];
    let props = [20_000.0, 4_000.0, 900.0];
    let vehicle = Vehicle::new("three", configs.clone(), kg(500.0), kmps(9.5)).unwrap();
    let snap = vehicle.resolve(&props).unwrap();

    let mut upper = 500.0;
    let mut total = 0.0;
    for i in (0..3).rev() {
        let model = StageModel::new(configs[i].clone()).unwrap();
        let state = model.compute(props[i], upper).unwrap();
        assert_eq!(snap.stages[i], state);
        upper = state.ignition_mass_kg;
        total += state.delta_v_mps;
    }
    assert_eq!(snap.delta_v_sum_mps, total);
    assert_eq!(snap.initial_mass_kg(), upper);
}

#[test]
fn single_stage_reference_scenario() {
    let stage = StageConfig::new(0.9, s(300.0), kn(10.0));
    let vehicle = Vehicle::new("ref", vec![stage], kg(0.0), mps(6774.0)).unwrap();
    let snap = vehicle.resolve(&[1000.0]).unwrap();

    let expected = 300.0 * G0_MPS2 * (1111.11_f64 / 111.11).ln();
    assert!((snap.delta_v_sum_mps - expected).abs() < 1.0);
    assert!((snap.stages[0].ignition_mass_kg - 1111.11).abs() < 0.01);
}

#[test]
fn degenerate_resolution_is_an_error() {
    let stage = StageConfig::new(0.9, s(300.0), kn(10.0));
    let vehicle = Vehicle::new("empty", vec![stage], kg(0.0), mps(1000.0)).unwrap();
    let err = vehicle.resolve(&[0.0]).unwrap_err();
    assert!(matches!(err, VehicleError::Degenerate { stage: 0, .. }));
}

#[test]
fn report_of_resolved_vehicle() {
    let stage = StageConfig::new(0.9, s(300.0), kn(10.0));
    let vehicle = Vehicle::new("ref", vec![stage], kg(10.0), mps(6000.0)).unwrap();
    let snap = vehicle.resolve(&[1000.0]).unwrap();
    let report = Report::build(&vehicle, &snap);

    let m0 = report.row("ignition mass m0").unwrap();
    assert_eq!(m0.stages, vec![snap.stages[0].ignition_mass_kg]);
}
