use crate::common::math_utils;
use crate::common::{Depth, Environment, Pressure, Time, DENSITY_MERCURY};
use core::f64::consts::LN_2;

const STANDARD_GRAVITY: f64 = 9.80665;
const PASCALS_PER_BAR: f64 = 100_000.;

/// Absolute pressure (bar) at a depth, water column on top of the altitude pressure.
pub fn depth_to_pressure(depth: Depth, environment: &Environment, fresh_water: bool) -> Pressure {
    environment.altitude_pressure
        + environment.water_density(fresh_water) * environment.gravity * depth.as_meters()
            / PASCALS_PER_BAR
}

/// Depth at which the water column exerts the given absolute pressure.
pub fn pressure_to_depth(bar: Pressure, environment: &Environment, fresh_water: bool) -> Depth {
    Depth::from_meters(
        (bar - environment.altitude_pressure) * PASCALS_PER_BAR
            / (environment.water_density(fresh_water) * environment.gravity),
    )
}

/// Rate of change of a gas fraction's partial pressure over a depth change (bar/min).
pub fn gas_rate_in_bars_per_minute(
    start_depth: Depth,
    end_depth: Depth,
    time: Time,
    f_gas: f64,
    environment: &Environment,
    fresh_water: bool,
) -> Pressure {
    let delta = depth_to_pressure(end_depth, environment, fresh_water)
        - depth_to_pressure(start_depth, environment, fresh_water);
    math_utils::abs(delta / time.as_minutes()) * f_gas
}

/// Partial pressure of a gas fraction breathed at depth (bar).
pub fn gas_pressure_breathing(
    depth: Depth,
    f_gas: f64,
    environment: &Environment,
    fresh_water: bool,
) -> Pressure {
    depth_to_pressure(depth, environment, fresh_water) * f_gas
}

/// Schreiner equation: gas loading under a linearly changing inspired pressure.
///
/// `p_end = p_insp + rate*(t - 1/k) - (p_insp - p_begin - rate/k)*e^(-k*t)`
/// with `k = ln 2 / half_time`, rate in bar/min, t in minutes.
pub fn schreiner(
    p_begin: Pressure,
    p_inspired: Pressure,
    time: Time,
    half_time: f64,
    rate: Pressure,
) -> Pressure {
    let k = LN_2 / half_time;
    let t = time.as_minutes();
    p_inspired + rate * (t - 1. / k) - (p_inspired - p_begin - rate / k) * math_utils::exp(-k * t)
}

/// Haldane equation: gas loading at a constant inspired pressure.
pub fn haldane(p_begin: Pressure, p_inspired: Pressure, half_time: f64, time: Time) -> Pressure {
    p_begin + (p_inspired - p_begin) * (1. - math_utils::exp(-(LN_2 / half_time) * time.as_minutes()))
}

/// Water vapour pressure (bar) at a temperature, Antoine equation over a mercury column.
pub fn water_vapour_pressure(degrees_celsius: f64) -> Pressure {
    let mm_hg = math_utils::powf(10., 8.07131 - 1730.63 / (233.426 + degrees_celsius));
    (mm_hg / 1000.) * DENSITY_MERCURY * STANDARD_GRAVITY / PASCALS_PER_BAR
}

/// Water vapour pressure in the lungs, taken at respiratory-tract temperature.
pub fn lung_water_vapour_pressure() -> Pressure {
    water_vapour_pressure(35.2)
}
