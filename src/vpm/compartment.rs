use core::f64::consts::LN_2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub(crate) const COMPARTMENT_COUNT: usize = 16;

pub(crate) const HELIUM_HALF_TIMES: [f64; COMPARTMENT_COUNT] = [
    1.88, 3.02, 4.72, 6.99, 10.21, 14.48, 20.53, 29.11, 41.20, 55.19, 70.69, 90.34, 115.29,
    147.42, 188.24, 240.03,
];

pub(crate) const NITROGEN_HALF_TIMES: [f64; COMPARTMENT_COUNT] = [
    5., 8., 12.5, 18.5, 27., 38.3, 54.3, 77., 109., 146., 187., 239., 305., 390., 498., 635.,
];

/// One VPM-B compartment. Pressures are in the engine's depth units, radii in
/// meters, gradients in depth units, times in minutes.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VpmCompartment {
    pub half_time_n2: f64,
    pub half_time_he: f64,
    pub k_n2: f64,
    pub k_he: f64,

    pub p_n2: f64,
    pub p_he: f64,
    /// loadings at the start of the segment being integrated
    pub initial_p_n2: f64,
    pub initial_p_he: f64,

    pub initial_critical_radius_n2: f64,
    pub initial_critical_radius_he: f64,
    pub adjusted_critical_radius_n2: f64,
    pub adjusted_critical_radius_he: f64,
    pub regenerated_radius_n2: f64,
    pub regenerated_radius_he: f64,

    pub max_crushing_pressure_n2: f64,
    pub max_crushing_pressure_he: f64,
    pub adjusted_crushing_pressure_n2: f64,
    pub adjusted_crushing_pressure_he: f64,

    pub initial_allowable_gradient_n2: f64,
    pub initial_allowable_gradient_he: f64,
    pub allowable_gradient_n2: f64,
    pub allowable_gradient_he: f64,
    pub deco_gradient_n2: f64,
    pub deco_gradient_he: f64,

    pub amb_pressure_onset_of_imperm: f64,
    pub gas_tension_onset_of_imperm: f64,

    pub surface_phase_volume_time: f64,
    pub phase_volume_time: f64,
    pub last_phase_volume_time: f64,
    pub max_actual_gradient: f64,
}

impl VpmCompartment {
    pub(crate) fn new(
        index: usize,
        critical_radius_n2: f64,
        critical_radius_he: f64,
        surface_n2_pressure: f64,
    ) -> Self {
        let half_time_n2 = NITROGEN_HALF_TIMES[index];
        let half_time_he = HELIUM_HALF_TIMES[index];
        Self {
            half_time_n2,
            half_time_he,
            k_n2: LN_2 / half_time_n2,
            k_he: LN_2 / half_time_he,
            p_n2: surface_n2_pressure,
            p_he: 0.,
            initial_p_n2: surface_n2_pressure,
            initial_p_he: 0.,
            initial_critical_radius_n2: critical_radius_n2,
            initial_critical_radius_he: critical_radius_he,
            adjusted_critical_radius_n2: critical_radius_n2,
            adjusted_critical_radius_he: critical_radius_he,
            regenerated_radius_n2: critical_radius_n2,
            regenerated_radius_he: critical_radius_he,
            max_crushing_pressure_n2: 0.,
            max_crushing_pressure_he: 0.,
            adjusted_crushing_pressure_n2: 0.,
            adjusted_crushing_pressure_he: 0.,
            initial_allowable_gradient_n2: 0.,
            initial_allowable_gradient_he: 0.,
            allowable_gradient_n2: 0.,
            allowable_gradient_he: 0.,
            deco_gradient_n2: 0.,
            deco_gradient_he: 0.,
            amb_pressure_onset_of_imperm: 0.,
            gas_tension_onset_of_imperm: 0.,
            surface_phase_volume_time: 0.,
            phase_volume_time: 0.,
            last_phase_volume_time: 0.,
            max_actual_gradient: 0.,
        }
    }

    pub fn gas_loading(&self) -> f64 {
        self.p_n2 + self.p_he
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_constants() {
        let cpt = VpmCompartment::new(0, 0.8e-6, 0.8e-6, 7.452);
        assert!((cpt.k_n2 - LN_2 / 5.).abs() < 1e-12);
        assert!((cpt.k_he - LN_2 / 1.88).abs() < 1e-12);
    }

    #[test]
    fn test_surface_equilibrium() {
        let cpt = VpmCompartment::new(7, 0.8e-6, 0.8e-6, 7.452);
        assert_eq!(cpt.p_n2, 7.452);
        assert_eq!(cpt.p_he, 0.);
        assert_eq!(cpt.gas_loading(), 7.452);
        assert_eq!(cpt.adjusted_critical_radius_n2, cpt.initial_critical_radius_n2);
    }
}
