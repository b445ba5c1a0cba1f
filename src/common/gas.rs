use crate::common::math_utils;
use crate::common::{
    depth_to_pressure, pressure_to_depth, ConfigError, Depth, Environment, Pressure,
};
use alloc::string::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Breathing mix described by its oxygen, helium and nitrogen fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gas {
    fo2: f64,
    fhe: f64,
    fn2: f64,
}

impl core::fmt::Display for Gas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.0}/{:.0}", self.fo2 * 100., self.fhe * 100.)
    }
}

impl Gas {
    /// init new gas with fractions (eg. 0.21, 0. for air)
    pub fn new(fo2: f64, fhe: f64) -> Self {
        if !(0. ..=1.).contains(&fo2) {
            panic!("Invalid O2 fraction");
        }
        if !(0. ..=1.).contains(&fhe) {
            panic!("Invalid He fraction [{fhe}]");
        }
        if (fo2 + fhe) > 1. {
            panic!("Invalid gas fractions, can't exceed 1ATA in total");
        }

        Self {
            fo2,
            fhe,
            fn2: math_utils::round((1. - (fo2 + fhe)) * 100.0) / 100.0,
        }
    }

    /// gas from all three fractions, validated to close to a whole
    pub fn from_fractions(fo2: f64, fn2: f64, fhe: f64) -> Result<Self, ConfigError> {
        let sum = fo2 + fn2 + fhe;
        if math_utils::abs(sum - 1.) > FRACTION_SUM_TOLERANCE {
            return Err(ConfigError::GasFractionsSum { sum });
        }
        if !(0. ..=1.).contains(&fo2) || !(0. ..=1.).contains(&fn2) || !(0. ..=1.).contains(&fhe) {
            return Err(ConfigError::GasFractionsSum { sum });
        }
        Ok(Self { fo2, fhe, fn2 })
    }

    pub fn air() -> Self {
        Self::new(0.21, 0.)
    }

    pub fn id(&self) -> String {
        let mut s = String::new();
        let _ = core::fmt::write(
            &mut s,
            format_args!("{:.0}/{:.0}", self.fo2 * 100., self.fhe * 100.),
        );
        s
    }

    pub fn fo2(&self) -> f64 {
        self.fo2
    }

    pub fn fhe(&self) -> f64 {
        self.fhe
    }

    pub fn fn2(&self) -> f64 {
        self.fn2
    }

    /// MOD: depth at which ppO2 reaches the given limit
    pub fn max_operating_depth(
        &self,
        pp_o2_limit: Pressure,
        environment: &Environment,
        fresh_water: bool,
    ) -> Depth {
        pressure_to_depth(pp_o2_limit / self.fo2, environment, fresh_water)
    }

    /// END: narcotic-equivalent depth, helium counted as non-narcotic
    pub fn equivalent_narcotic_depth(
        &self,
        depth: Depth,
        environment: &Environment,
        fresh_water: bool,
    ) -> Depth {
        let narcotic = depth_to_pressure(depth, environment, fresh_water) * (self.fo2 + self.fn2);
        let end = pressure_to_depth(narcotic, environment, fresh_water);
        if end < Depth::zero() {
            Depth::zero()
        } else {
            end
        }
    }

    /// EAD: depth at which air would carry the same nitrogen partial pressure
    pub fn equivalent_air_depth(
        &self,
        depth: Depth,
        environment: &Environment,
        fresh_water: bool,
    ) -> Depth {
        let n2 = depth_to_pressure(depth, environment, fresh_water) * self.fn2;
        let ead = pressure_to_depth(n2 / Gas::air().fn2, environment, fresh_water);
        if ead < Depth::zero() {
            Depth::zero()
        } else {
            ead
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_valid_gas_air() {
        let air = Gas::new(0.21, 0.);
        assert_eq!(air.fo2(), 0.21);
        assert_eq!(air.fn2(), 0.79);
        assert_eq!(air.fhe(), 0.);
    }

    #[test]
    fn test_valid_gas_tmx() {
        let tmx = Gas::new(0.18, 0.35);
        assert_eq!(tmx.fo2(), 0.18);
        assert_eq!(tmx.fhe(), 0.35);
        assert_eq!(tmx.fn2(), 0.47);
    }

    #[test]
    #[should_panic]
    fn test_invalid_o2_high() {
        Gas::new(1.1, 0.);
    }

    #[test]
    #[should_panic]
    fn test_invalid_fractions() {
        Gas::new(0.5, 0.51);
    }

    #[test]
    fn test_fraction_closure() {
        let test_cases = vec![(0.21, 0.), (0.32, 0.), (0.18, 0.45), (1., 0.), (0.1, 0.7)];
        for (fo2, fhe) in test_cases {
            let gas = Gas::new(fo2, fhe);
            assert!((gas.fo2() + gas.fhe() + gas.fn2() - 1.).abs() < 1e-9);
        }
    }

    #[test]
    fn test_from_fractions_sum_check() {
        assert!(Gas::from_fractions(0.21, 0.79, 0.).is_ok());
        let res = Gas::from_fractions(0.22, 0.79, 0.);
        assert!(matches!(res, Err(ConfigError::GasFractionsSum { .. })));
    }

    #[test]
    fn test_mod() {
        let environment = Environment::default();
        let ean50 = Gas::new(0.5, 0.);
        let calculated_mod = ean50.max_operating_depth(1.6, &environment, false);
        assert!((calculated_mod.as_meters() - 21.78).abs() < 0.01);

        let bottomless = Gas::new(0., 0.);
        assert_eq!(
            bottomless
                .max_operating_depth(1.4, &environment, false)
                .as_meters(),
            f64::INFINITY
        );
    }

    #[test]
    fn test_end() {
        let environment = Environment::default();
        // air's narcotic index is 1, END == depth
        let air = Gas::air();
        let end = air.equivalent_narcotic_depth(Depth::from_meters(40.), &environment, false);
        assert!((end.as_meters() - 40.).abs() < 1e-9);

        // helium dilutes narcosis
        let tmx = Gas::new(0.21, 0.4);
        let end = tmx.equivalent_narcotic_depth(Depth::from_meters(60.), &environment, false);
        assert!(end < Depth::from_meters(40.));
    }

    #[test]
    fn test_ead_inverts_end_for_nitrox() {
        let environment = Environment::default();
        let ean32 = Gas::new(0.32, 0.);
        let ead = ean32.equivalent_air_depth(Depth::from_meters(30.), &environment, false);
        assert!(ead < Depth::from_meters(30.));
    }

    #[test]
    fn test_id() {
        let ean32 = Gas::new(0.32, 0.);
        assert_eq!(ean32.id(), "32/0");
        let tmx2135 = Gas::new(0.21, 0.35);
        assert_eq!(tmx2135.id(), "21/35");
    }
}
