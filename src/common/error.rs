use alloc::string::String;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rejected settings or gas declarations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConfigError {
    UnknownUnits(String),
    UnknownToggle(String),
    CriticalRadiusOutOfRange { microns: f64 },
    NonPositiveRegenerationPeriod { minutes: f64 },
    AltitudeAboveEverest { altitude: f64 },
    GasFractionsSum { sum: f64 },
    ZeroAscentToAltitudeTime,
    AcclimatizedAltitudeAboveDive { starting: f64, dive: f64 },
    GradientFactorOutOfRange { gf: f64 },
    NonPositivePressure { bar: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownUnits(units) => {
                write!(f, "Unknown units [{units}], expected fsw or msw")
            }
            ConfigError::UnknownToggle(toggle) => {
                write!(f, "Unknown toggle [{toggle}], expected on/off or yes/no")
            }
            ConfigError::CriticalRadiusOutOfRange { microns } => {
                write!(
                    f,
                    "Critical radius [{microns}] microns outside the 0.2-1.35 range"
                )
            }
            ConfigError::NonPositiveRegenerationPeriod { minutes } => {
                write!(f, "Regeneration time constant [{minutes}] must be positive")
            }
            ConfigError::AltitudeAboveEverest { altitude } => {
                write!(f, "Altitude [{altitude}] is above Mount Everest")
            }
            ConfigError::GasFractionsSum { sum } => {
                write!(f, "Gas fractions sum to [{sum}], expected 1.0")
            }
            ConfigError::ZeroAscentToAltitudeTime => {
                write!(f, "Non-acclimatized diver requires an ascent-to-altitude time")
            }
            ConfigError::AcclimatizedAltitudeAboveDive { starting, dive } => {
                write!(
                    f,
                    "Starting acclimatized altitude [{starting}] is not below dive altitude [{dive}]"
                )
            }
            ConfigError::GradientFactorOutOfRange { gf } => {
                write!(f, "Gradient factor [{gf}] must be positive")
            }
            ConfigError::NonPositivePressure { bar } => {
                write!(f, "Pressure [{bar}] bar must be positive")
            }
        }
    }
}

/// Rejected plan operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlanError {
    UnknownGas(String),
    NothingToDecompressFrom,
    NoUsableDecoGas { depth_meters: f64 },
    InvalidProfileCode(i32),
    InvalidRepetitiveFlag(i32),
    GasMixNumberOutOfRange { number: usize, available: usize },
    MissingSurfaceInterval,
    Unsupported(&'static str),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::UnknownGas(label) => write!(f, "Unknown gas [{label}]"),
            PlanError::NothingToDecompressFrom => {
                write!(f, "No segments and no starting depth to decompress from")
            }
            PlanError::NoUsableDecoGas { depth_meters } => {
                write!(f, "No usable deco gas at {depth_meters}m")
            }
            PlanError::InvalidProfileCode(code) => {
                write!(f, "Invalid profile code [{code}], expected 1, 2 or 99")
            }
            PlanError::InvalidRepetitiveFlag(code) => {
                write!(f, "Invalid repetitive dive flag [{code}], expected 0 or 1")
            }
            PlanError::GasMixNumberOutOfRange { number, available } => {
                write!(
                    f,
                    "Gas mix number [{number}] outside the declared range 1-{available}"
                )
            }
            PlanError::MissingSurfaceInterval => {
                write!(f, "Repetitive dive without a surface interval time")
            }
            PlanError::Unsupported(operation) => {
                write!(f, "Operation [{operation}] is not supported by this model")
            }
        }
    }
}

/// Numerical breakdowns inside the solvers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NumericError {
    MaxIterationsExceeded(&'static str),
    RootNotBracketed(&'static str),
    StepSizeTooLarge,
    OffGassingGradientTooSmall { depth_meters: f64 },
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::MaxIterationsExceeded(what) => {
                write!(f, "Iteration limit exceeded in {what}")
            }
            NumericError::RootNotBracketed(what) => {
                write!(f, "Root is not within brackets in {what}")
            }
            NumericError::StepSizeTooLarge => {
                write!(f, "Step size is too large to decompress")
            }
            NumericError::OffGassingGradientTooSmall { depth_meters } => {
                write!(
                    f,
                    "Off-gassing gradient is too small to decompress at the {depth_meters}m stop"
                )
            }
        }
    }
}

/// Anything `calculate_decompression` can fail with.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DecoError {
    Config(ConfigError),
    Plan(PlanError),
    Numeric(NumericError),
}

impl fmt::Display for DecoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoError::Config(e) => write!(f, "{e}"),
            DecoError::Plan(e) => write!(f, "{e}"),
            DecoError::Numeric(e) => write!(f, "{e}"),
        }
    }
}

impl From<ConfigError> for DecoError {
    fn from(e: ConfigError) -> Self {
        DecoError::Config(e)
    }
}

impl From<PlanError> for DecoError {
    fn from(e: PlanError) -> Self {
        DecoError::Plan(e)
    }
}

impl From<NumericError> for DecoError {
    fn from(e: NumericError) -> Self {
        DecoError::Numeric(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = PlanError::UnknownGas("ean50".to_string());
        assert_eq!(err.to_string(), "Unknown gas [ean50]");

        let err = NumericError::MaxIterationsExceeded("radius root finder");
        assert_eq!(err.to_string(), "Iteration limit exceeded in radius root finder");

        let err: DecoError = ConfigError::GasFractionsSum { sum: 1.01 }.into();
        assert_eq!(err.to_string(), "Gas fractions sum to [1.01], expected 1.0");
    }
}
