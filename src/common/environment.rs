use crate::common::Pressure;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DENSITY_FRESH_WATER: f64 = 1000.;
pub const DENSITY_SALT_WATER: f64 = 1030.;
pub const DENSITY_MERCURY: f64 = 13595.1;

/// Ambient conditions at the dive site. A plain value: construct one, hand it
/// to a plan, and every conversion in that plan uses it. Defaults are Earth
/// sea level.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Environment {
    /// absolute pressure at the surface of the water (bar)
    pub surface_pressure: Pressure,
    /// acceleration of gravity (m/s2)
    pub gravity: f64,
    /// atmospheric pressure at the dive site altitude (bar)
    pub altitude_pressure: Pressure,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            surface_pressure: 1.,
            gravity: 9.80665,
            altitude_pressure: 1.,
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface_pressure(mut self, surface_pressure: Pressure) -> Self {
        self.surface_pressure = surface_pressure;
        self
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_altitude_pressure(mut self, altitude_pressure: Pressure) -> Self {
        self.altitude_pressure = altitude_pressure;
        self
    }

    pub(crate) fn water_density(&self, fresh_water: bool) -> f64 {
        if fresh_water {
            DENSITY_FRESH_WATER
        } else {
            DENSITY_SALT_WATER
        }
    }
}
