//! uom quantity types and constructors used at crate boundaries.

use uom::si::f64::{
    Acceleration as UomAcceleration, Area as UomArea, Force as UomForce, Mass as UomMass,
    Pressure as UomPressure, Time as UomTime, Velocity as UomVelocity,
};

pub type Accel = UomAcceleration;
pub type Area = UomArea;
pub type Force = UomForce;
pub type Mass = UomMass;
pub type Pressure = UomPressure;
pub type Time = UomTime;
pub type Velocity = UomVelocity;

#[inline]
pub fn kg(v: f64) -> Mass {
    use uom::si::mass::kilogram;
    Mass::new::<kilogram>(v)
}

#[inline]
pub fn kn(v: f64) -> Force {
    use uom::si::force::kilonewton;
    Force::new::<kilonewton>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn kmps(v: f64) -> Velocity {
    use uom::si::velocity::kilometer_per_second;
    Velocity::new::<kilometer_per_second>(v)
}

pub mod constants {
    use super::*;

    pub const G0_MPS2: f64 = 9.806_65;

    /// Ambient pressure used for the sea-level thrust correction.
    pub const SEA_LEVEL_PRESSURE_PA: f64 = 101_300.0;

    #[inline]
    pub fn g0() -> Accel {
        use uom::si::acceleration::meter_per_second_squared;
        Accel::new::<meter_per_second_squared>(G0_MPS2)
    }

    #[inline]
    pub fn sea_level_pressure() -> Pressure {
        pa(SEA_LEVEL_PRESSURE_PA)
    }
}
