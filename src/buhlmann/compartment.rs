use crate::buhlmann::zhl_values::ZhlParams;
use crate::common::math_utils;
use crate::common::{
    gas_pressure_breathing, gas_rate_in_bars_per_minute, lung_water_vapour_pressure,
    pressure_to_depth, schreiner, Depth, Environment, Gas, GradientFactor, Pressure, Time,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One ZH-L16 compartment carrying nitrogen and helium loadings.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BuhlmannCompartment {
    pub params: ZhlParams,
    pub p_n2: Pressure,
    pub p_he: Pressure,
    pub p_total: Pressure,
}

impl BuhlmannCompartment {
    /// surface-equilibrated compartment: nitrogen at the alveolar fraction of
    /// the ambient pressure less lung water vapour, no helium
    pub fn new(params: ZhlParams, abs_pressure: Pressure) -> Self {
        let p_n2 = (abs_pressure - lung_water_vapour_pressure()) * Gas::air().fn2();
        Self {
            params,
            p_n2,
            p_he: 0.,
            p_total: p_n2,
        }
    }

    /// Load the compartment across a depth change, each nuclide integrated
    /// separately with its own half-time. Returns the change in total
    /// inert-gas pressure.
    pub fn add_depth_change(
        &mut self,
        start_depth: Depth,
        end_depth: Depth,
        gas: &Gas,
        time: Time,
        environment: &Environment,
        fresh_water: bool,
    ) -> Pressure {
        if time.as_minutes() <= 0. {
            return 0.;
        }
        let (n2_ht, _, _, he_ht, _, _) = self.params;

        let n2_inspired = gas_pressure_breathing(end_depth, gas.fn2(), environment, fresh_water);
        let n2_rate =
            gas_rate_in_bars_per_minute(start_depth, end_depth, time, gas.fn2(), environment, fresh_water);
        self.p_n2 = schreiner(self.p_n2, n2_inspired, time, n2_ht, n2_rate);

        let he_inspired = gas_pressure_breathing(end_depth, gas.fhe(), environment, fresh_water);
        let he_rate =
            gas_rate_in_bars_per_minute(start_depth, end_depth, time, gas.fhe(), environment, fresh_water);
        self.p_he = schreiner(self.p_he, he_inspired, time, he_ht, he_rate);

        let previous_total = self.p_total;
        self.p_total = self.p_n2 + self.p_he;
        self.p_total - previous_total
    }

    /// Tolerated depth under the given gradient factor, rounded up to the
    /// next whole meter.
    pub fn ceiling(
        &self,
        gf: GradientFactor,
        environment: &Environment,
        fresh_water: bool,
    ) -> Depth {
        let (_, n2_a, n2_b, _, he_a, he_b) = self.params;
        let a = (n2_a * self.p_n2 + he_a * self.p_he) / self.p_total;
        let b = (n2_b * self.p_n2 + he_b * self.p_he) / self.p_total;
        let ceiling_bar = (self.p_total - a * gf) / (gf / b + 1. - gf);
        let depth = pressure_to_depth(ceiling_bar, environment, fresh_water);
        Depth::from_meters(math_utils::ceil(depth.as_meters()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buhlmann::zhl_values::ZH16B_TISSUES;

    fn compartment(row: usize) -> BuhlmannCompartment {
        BuhlmannCompartment::new(ZH16B_TISSUES[row], 1.)
    }

    #[test]
    fn test_surface_state() {
        let cpt = compartment(0);
        assert!((cpt.p_n2 - (1. - 0.0567) * 0.79).abs() < 1e-3);
        assert_eq!(cpt.p_he, 0.);
        assert_eq!(cpt.p_total, cpt.p_n2);
    }

    #[test]
    fn test_descent_ongassing() {
        let environment = Environment::default();
        let air = Gas::air();
        let mut cpt = compartment(5);
        let before = cpt.p_total;
        cpt.add_depth_change(
            Depth::zero(),
            Depth::from_meters(30.),
            &air,
            Time::from_minutes(3.),
            &environment,
            false,
        );
        assert!(cpt.p_total > before);
        assert_eq!(cpt.p_he, 0.);
    }

    #[test]
    fn test_helium_loads_separately() {
        let environment = Environment::default();
        let tmx = Gas::new(0.21, 0.35);
        let mut cpt = compartment(3);
        cpt.add_depth_change(
            Depth::from_meters(40.),
            Depth::from_meters(40.),
            &tmx,
            Time::from_minutes(20.),
            &environment,
            false,
        );
        assert!(cpt.p_he > 0.);
        assert!((cpt.p_total - (cpt.p_n2 + cpt.p_he)).abs() < 1e-12);
    }

    #[test]
    fn test_ceiling_monotone_in_gf() {
        let environment = Environment::default();
        let air = Gas::air();
        let mut cpt = compartment(2);
        cpt.add_depth_change(
            Depth::from_meters(45.),
            Depth::from_meters(45.),
            &air,
            Time::from_minutes(30.),
            &environment,
            false,
        );
        let permissive = cpt.ceiling(1., &environment, false);
        let conservative = cpt.ceiling(0.2, &environment, false);
        assert!(permissive <= conservative);
    }

    #[test]
    fn test_zero_time_is_a_no_op() {
        let environment = Environment::default();
        let air = Gas::air();
        let mut cpt = compartment(1);
        let delta = cpt.add_depth_change(
            Depth::from_meters(20.),
            Depth::from_meters(20.),
            &air,
            Time::zero(),
            &environment,
            false,
        );
        assert_eq!(delta, 0.);
    }
}
