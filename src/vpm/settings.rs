use crate::common::ConfigError;
use alloc::string::ToString;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MIN_CRITICAL_RADIUS_MICRONS: f64 = 0.2;
const MAX_CRITICAL_RADIUS_MICRONS: f64 = 1.35;
const EVEREST_METERS: f64 = 9144.;
const EVEREST_FEET: f64 = 30_000.;

/// Depth-pressure unit system of the bubble model.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Units {
    Fsw,
    Msw,
}

impl Units {
    /// depth units per atmosphere
    pub fn units_factor(&self) -> f64 {
        match self {
            Units::Fsw => 33.,
            Units::Msw => 10.1325,
        }
    }

    pub(crate) fn everest(&self) -> f64 {
        match self {
            Units::Fsw => EVEREST_FEET,
            Units::Msw => EVEREST_METERS,
        }
    }
}

impl FromStr for Units {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("fsw") {
            Ok(Units::Fsw)
        } else if s.eq_ignore_ascii_case("msw") {
            Ok(Units::Msw)
        } else {
            Err(ConfigError::UnknownUnits(s.to_string()))
        }
    }
}

/// On/off switch accepted in the spellings the reference inputs use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(&self) -> bool {
        *self == Toggle::On
    }
}

impl FromStr for Toggle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("on") || s.eq_ignore_ascii_case("yes") {
            Ok(Toggle::On)
        } else if s.eq_ignore_ascii_case("off") || s.eq_ignore_ascii_case("no") {
            Ok(Toggle::Off)
        } else {
            Err(ConfigError::UnknownToggle(s.to_string()))
        }
    }
}

/// VPM-B tuning constants. Defaults are the reference model's nominal values
/// in the chosen unit system.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VpmSettings {
    pub units: Units,
    /// initial critical radii (microns)
    pub critical_radius_n2_microns: f64,
    pub critical_radius_he_microns: f64,
    /// iterate allowable gradients on integrated phase volume
    pub critical_volume_algorithm: bool,
    /// lambda, always in fsw-min
    pub crit_volume_parameter_lambda: f64,
    /// gradient at which bubble skins go impermeable (atm)
    pub gradient_onset_of_imperm_atm: f64,
    /// surface tension gamma (N/m)
    pub surface_tension_gamma: f64,
    /// skin compression gamma-c (N/m)
    pub skin_compression_gamma_c: f64,
    /// nuclear regeneration time constant (minutes)
    pub regeneration_time_constant: f64,
    /// constant partial pressure of gases other than N2/He (mmHg)
    pub pressure_other_gases_mmhg: f64,
    /// deco stop times round up to a multiple of this (minutes)
    pub minimum_deco_stop_time: f64,
    /// distance between deco stops (depth units)
    pub deco_step_size: f64,
    /// deco ascent rate (depth units per minute)
    pub deco_ascent_rate: f64,
    /// correct starting state for a dive at altitude
    pub altitude_dive_algorithm: bool,
}

impl VpmSettings {
    pub fn new(units: Units) -> Self {
        let (deco_step_size, deco_ascent_rate) = match units {
            Units::Fsw => (10., 33.),
            Units::Msw => (3., 10.),
        };
        Self {
            units,
            critical_radius_n2_microns: 0.55,
            critical_radius_he_microns: 0.45,
            critical_volume_algorithm: true,
            crit_volume_parameter_lambda: 6500.,
            gradient_onset_of_imperm_atm: 8.2,
            surface_tension_gamma: 0.0179,
            skin_compression_gamma_c: 0.257,
            regeneration_time_constant: 20160.,
            pressure_other_gases_mmhg: 102.,
            minimum_deco_stop_time: 1.,
            deco_step_size,
            deco_ascent_rate,
            altitude_dive_algorithm: false,
        }
    }

    pub fn with_critical_radii(mut self, n2_microns: f64, he_microns: f64) -> Self {
        self.critical_radius_n2_microns = n2_microns;
        self.critical_radius_he_microns = he_microns;
        self
    }

    pub fn with_critical_volume_algorithm(mut self, on: bool) -> Self {
        self.critical_volume_algorithm = on;
        self
    }

    pub fn with_altitude_dive_algorithm(mut self, on: bool) -> Self {
        self.altitude_dive_algorithm = on;
        self
    }

    pub fn with_deco_step_size(mut self, step: f64) -> Self {
        self.deco_step_size = step;
        self
    }

    pub fn with_deco_ascent_rate(mut self, rate: f64) -> Self {
        self.deco_ascent_rate = rate;
        self
    }

    pub fn with_minimum_deco_stop_time(mut self, minutes: f64) -> Self {
        self.minimum_deco_stop_time = minutes;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for microns in [self.critical_radius_n2_microns, self.critical_radius_he_microns] {
            if !(MIN_CRITICAL_RADIUS_MICRONS..=MAX_CRITICAL_RADIUS_MICRONS).contains(&microns) {
                return Err(ConfigError::CriticalRadiusOutOfRange { microns });
            }
        }
        if self.regeneration_time_constant <= 0. {
            return Err(ConfigError::NonPositiveRegenerationPeriod {
                minutes: self.regeneration_time_constant,
            });
        }
        for bar in [
            self.crit_volume_parameter_lambda,
            self.gradient_onset_of_imperm_atm,
            self.surface_tension_gamma,
            self.skin_compression_gamma_c,
            self.pressure_other_gases_mmhg,
            self.minimum_deco_stop_time,
            self.deco_step_size,
            self.deco_ascent_rate,
        ] {
            if bar <= 0. {
                return Err(ConfigError::NonPositivePressure { bar });
            }
        }
        Ok(())
    }
}

impl Default for VpmSettings {
    fn default() -> Self {
        Self::new(Units::Msw)
    }
}

/// Altitude block for dives away from sea level.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AltitudeSettings {
    /// altitude of the dive site (depth units: meters for msw, feet for fsw)
    pub altitude_of_dive: f64,
    pub diver_acclimatized: bool,
    /// altitude the diver is equilibrated to before travelling
    pub starting_acclimatized_altitude: f64,
    pub ascent_to_altitude_hours: f64,
    pub hours_at_altitude_before_dive: f64,
}

impl Default for AltitudeSettings {
    fn default() -> Self {
        Self {
            altitude_of_dive: 0.,
            diver_acclimatized: true,
            starting_acclimatized_altitude: 0.,
            ascent_to_altitude_hours: 0.,
            hours_at_altitude_before_dive: 0.,
        }
    }
}

impl AltitudeSettings {
    pub fn validate(&self, units: Units) -> Result<(), ConfigError> {
        if self.altitude_of_dive > units.everest()
            || self.starting_acclimatized_altitude > units.everest()
        {
            return Err(ConfigError::AltitudeAboveEverest {
                altitude: self.altitude_of_dive.max(self.starting_acclimatized_altitude),
            });
        }
        if !self.diver_acclimatized {
            if self.ascent_to_altitude_hours <= 0. {
                return Err(ConfigError::ZeroAscentToAltitudeTime);
            }
            if self.starting_acclimatized_altitude >= self.altitude_of_dive {
                return Err(ConfigError::AcclimatizedAltitudeAboveDive {
                    starting: self.starting_acclimatized_altitude,
                    dive: self.altitude_of_dive,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn test_units_parse() {
        assert_eq!("fsw".parse::<Units>(), Ok(Units::Fsw));
        assert_eq!("MSW".parse::<Units>(), Ok(Units::Msw));
        assert_eq!(
            "bar".parse::<Units>(),
            Err(ConfigError::UnknownUnits(String::from("bar")))
        );
    }

    #[test]
    fn test_toggle_parse() {
        assert_eq!("on".parse::<Toggle>(), Ok(Toggle::On));
        assert_eq!("No".parse::<Toggle>(), Ok(Toggle::Off));
        assert!("maybe".parse::<Toggle>().is_err());
    }

    #[test]
    fn test_default_settings_validate() {
        assert_eq!(VpmSettings::default().validate(), Ok(()));
        assert_eq!(VpmSettings::new(Units::Fsw).validate(), Ok(()));
    }

    #[test]
    fn test_radius_range() {
        let settings = VpmSettings::default().with_critical_radii(1.4, 0.8);
        assert_eq!(
            settings.validate(),
            Err(ConfigError::CriticalRadiusOutOfRange { microns: 1.4 })
        );
        let settings = VpmSettings::default().with_critical_radii(0.8, 0.1);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_altitude_validation() {
        let mut alt = AltitudeSettings {
            altitude_of_dive: 10_000.,
            ..Default::default()
        };
        assert!(alt.validate(Units::Msw).is_err());
        assert_eq!(alt.validate(Units::Fsw), Ok(()));

        alt.altitude_of_dive = 2000.;
        alt.diver_acclimatized = false;
        alt.ascent_to_altitude_hours = 0.;
        assert_eq!(
            alt.validate(Units::Msw),
            Err(ConfigError::ZeroAscentToAltitudeTime)
        );

        alt.ascent_to_altitude_hours = 2.;
        alt.starting_acclimatized_altitude = 2500.;
        assert!(matches!(
            alt.validate(Units::Msw),
            Err(ConfigError::AcclimatizedAltitudeAboveDive { .. })
        ));
    }
}
