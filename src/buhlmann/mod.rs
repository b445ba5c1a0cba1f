mod compartment;
mod plan;
mod zhl_values;

pub use compartment::BuhlmannCompartment;
pub use plan::BuhlmannPlan;
pub use zhl_values::{ZhlParams, ZhlTable, ZH16A_TISSUES, ZH16B_TISSUES, ZH16C_TISSUES};
