mod depth;
mod environment;
mod error;
mod gas;
pub mod math_utils;
mod physics;
mod plan;
mod segment;
mod time;

pub use depth::{feet_to_meters, meters_to_feet, Depth, DepthType};
pub use environment::{
    Environment, DENSITY_FRESH_WATER, DENSITY_MERCURY, DENSITY_SALT_WATER,
};
pub use error::{ConfigError, DecoError, NumericError, PlanError};
pub use gas::Gas;
pub use physics::{
    depth_to_pressure, gas_pressure_breathing, gas_rate_in_bars_per_minute, haldane,
    lung_water_vapour_pressure, pressure_to_depth, schreiner, water_vapour_pressure,
};
pub use plan::{DecoParams, DecoPlan};
pub(crate) use plan::GasBank;
pub(crate) use segment::collapse_segments;
pub use segment::{DecoSchedule, DecoWarning, Segment};
pub use time::Time;

pub type Pressure = f64;
pub type GradientFactor = f64;
pub type AscentRatePerMinute = f64;
