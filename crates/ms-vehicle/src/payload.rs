//! Payload sensitivity for a fixed propellant loading.

use crate::error::{VehicleError, VehicleResult};
use crate::vehicle::Vehicle;
use ms_core::ensure_finite;
use serde::Serialize;

const MAX_BRACKET_DOUBLINGS: usize = 80;
const MAX_BISECTIONS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayloadPoint {
    pub payload_kg: f64,
    pub delta_v_mps: f64,
}

/// Total delta-v of `vehicle` loaded with `propellant_kg` and carrying `payload_kg`.
pub fn delta_v_for_payload(
    vehicle: &Vehicle,
    propellant_kg: &[f64],
    payload_kg: f64,
) -> VehicleResult<f64> {
    check_payload(payload_kg)?;
    let snapshot = vehicle.resolve_with_payload(propellant_kg, payload_kg)?;
    Ok(snapshot.delta_v_sum_mps)
}

/// Evaluate total delta-v at each payload.
pub fn payload_sweep(
    vehicle: &Vehicle,
    propellant_kg: &[f64],
    payloads_kg: &[f64],
) -> VehicleResult<Vec<PayloadPoint>> {
    payloads_kg
        .iter()
        .map(|&payload_kg| {
            Ok(PayloadPoint {
                payload_kg,
                delta_v_mps: delta_v_for_payload(vehicle, propellant_kg, payload_kg)?,
            })
        })
        .collect()
}

/// Heaviest payload for which the fixed loading still reaches `target_mps`.
///
/// Total delta-v falls strictly as payload grows, so the answer is found by
/// bracketing and bisection. Returns `None` when even a zero payload falls
/// short of the target.
pub fn max_payload_for_delta_v(
    vehicle: &Vehicle,
    propellant_kg: &[f64],
    target_mps: f64,
) -> VehicleResult<Option<f64>> {
    let target_mps = ensure_finite(target_mps, "target delta-v")?;
    if target_mps <= 0.0 {
        return Err(VehicleError::InvalidParameter {
            what: format!("target delta-v must be positive, got {target_mps}"),
        });
    }

    if delta_v_for_payload(vehicle, propellant_kg, 0.0)? < target_mps {
        return Ok(None);
    }

    let mut lo = 0.0;
    let mut hi = propellant_kg.iter().sum::<f64>().max(1.0);
    let mut doublings = 0;
    while delta_v_for_payload(vehicle, propellant_kg, hi)? >= target_mps {
        lo = hi;
        hi *= 2.0;
        doublings += 1;
        if doublings >= MAX_BRACKET_DOUBLINGS {
            return Ok(Some(lo));
        }
    }

    for _ in 0..MAX_BISECTIONS {
        if hi - lo <= 1e-9 * hi.max(1.0) {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if delta_v_for_payload(vehicle, propellant_kg, mid)? >= target_mps {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(Some(lo))
}

fn check_payload(payload_kg: f64) -> VehicleResult<()> {
    ensure_finite(payload_kg, "payload mass")?;
    if payload_kg < 0.0 {
        return Err(VehicleError::InvalidParameter {
            what: format!("payload mass must be non-negative, got {payload_kg}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageConfig;
    use ms_core::units::{kg, kmps, kn, s};

    fn vehicle() -> Vehicle {
        let first = StageConfig::new(0.9, s(280.0), kn(50.0)).with_engine_count(4);
        let second = StageConfig::new(0.88, s(320.0), kn(20.0)).with_jettison(kg(20.0));
        Vehicle::new("demo", vec![first, second], kg(200.0), kmps(9.0)).unwrap()
    }

    const PROP: [f64; 2] = [12_000.0, 2_000.0];

    #[test]
    fn nominal_payload_matches_resolve() {
        let v = vehicle();
        let dv = delta_v_for_payload(&v, &PROP, 200.0).unwrap();
        assert_eq!(dv, v.resolve(&PROP).unwrap().delta_v_sum_mps);
    }

    #[test]
    fn sweep_is_strictly_decreasing() {
        let v = vehicle();
        let points = payload_sweep(&v, &PROP, &[0.0, 100.0, 500.0, 2_000.0]).unwrap();
        assert_eq!(points.len(), 4);
        for pair in points.windows(2) {
            assert!(pair[1].delta_v_mps < pair[0].delta_v_mps);
        }
    }

    #[test]
    fn max_payload_hits_target() {
        let v = vehicle();
        let target = delta_v_for_payload(&v, &PROP, 350.0).unwrap();
        let payload = max_payload_for_delta_v(&v, &PROP, target).unwrap().unwrap();

        assert!((payload - 350.0).abs() < 1e-3);
        let dv = delta_v_for_payload(&v, &PROP, payload).unwrap();
        assert!(dv >= target);
    }

    #[test]
    fn unreachable_target_gives_none() {
        let v = vehicle();
        let best = delta_v_for_payload(&v, &PROP, 0.0).unwrap();
        assert_eq!(max_payload_for_delta_v(&v, &PROP, best + 100.0).unwrap(), None);
    }

    #[test]
    fn invalid_inputs_rejected() {
        let v = vehicle();
        assert!(delta_v_for_payload(&v, &PROP, -5.0).is_err());
        assert!(max_payload_for_delta_v(&v, &PROP, 0.0).is_err());
        assert!(matches!(
            payload_sweep(&v, &[1.0], &[10.0]),
            Err(VehicleError::ShapeMismatch { .. })
        ));
    }
}
