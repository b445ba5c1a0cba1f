mod compartment;
mod dive_state;
mod engine;
mod plan;
mod roots;
mod settings;

pub use compartment::VpmCompartment;
pub use dive_state::{
    DiveInput, DiveResult, DiveState, GasSummary, GasSwitch, ProfileCode, VpmConfig,
};
pub use plan::VpmPlan;
pub use settings::{AltitudeSettings, Toggle, Units, VpmSettings};
