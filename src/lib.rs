#![cfg_attr(feature = "no-std", no_std)]
extern crate alloc;

mod buhlmann;
mod common;
mod vpm;

pub use buhlmann::{
    BuhlmannCompartment, BuhlmannPlan, ZhlParams, ZhlTable, ZH16A_TISSUES, ZH16B_TISSUES,
    ZH16C_TISSUES,
};

pub use common::{
    depth_to_pressure, feet_to_meters, gas_pressure_breathing, gas_rate_in_bars_per_minute,
    haldane, meters_to_feet, pressure_to_depth, schreiner, water_vapour_pressure, ConfigError,
    DecoError, DecoParams, DecoPlan, DecoSchedule, DecoWarning, Depth, DepthType, Environment,
    Gas, GradientFactor, NumericError, PlanError, Pressure, Segment, Time,
};

pub use vpm::{
    AltitudeSettings, DiveInput, DiveResult, DiveState, GasSummary, GasSwitch, ProfileCode,
    Toggle, Units, VpmCompartment, VpmConfig, VpmPlan, VpmSettings,
};

// Re-export Vec and vec macro from alloc for convenience
pub use alloc::vec;
pub use alloc::vec::Vec;
