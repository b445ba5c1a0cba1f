use crate::common::math_utils;
use crate::common::{
    DecoError, DecoSchedule, Depth, Environment, Gas, GradientFactor, PlanError, Pressure,
    Segment, Time,
};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Knobs for a decompression calculation, shared by both models.
///
/// The gradient-factor pair is only read by the Buhlmann plan; the VPM plan
/// takes its conservatism from its settings and ignores `gf_low`/`gf_high`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecoParams {
    pub maintain_tissues: bool,
    pub gf_low: GradientFactor,
    pub gf_high: GradientFactor,
    pub max_ppo2: Pressure,
    pub max_end: Depth,
    pub from_depth: Option<Depth>,
}

impl Default for DecoParams {
    fn default() -> Self {
        Self {
            maintain_tissues: false,
            gf_low: 1.,
            gf_high: 1.,
            max_ppo2: 1.6,
            max_end: Depth::from_meters(30.),
            from_depth: None,
        }
    }
}

impl DecoParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_maintain_tissues(mut self, maintain_tissues: bool) -> Self {
        self.maintain_tissues = maintain_tissues;
        self
    }

    pub fn with_gradient_factors(mut self, gf_low: GradientFactor, gf_high: GradientFactor) -> Self {
        self.gf_low = gf_low;
        self.gf_high = gf_high;
        self
    }

    pub fn with_max_ppo2(mut self, max_ppo2: Pressure) -> Self {
        self.max_ppo2 = max_ppo2;
        self
    }

    pub fn with_max_end(mut self, max_end: Depth) -> Self {
        self.max_end = max_end;
        self
    }

    pub fn with_from_depth(mut self, from_depth: Depth) -> Self {
        self.from_depth = Some(from_depth);
        self
    }
}

/// The unified planning surface both decompression models implement.
pub trait DecoPlan {
    /// declare a bottom mix under a label
    fn add_bottom_gas(&mut self, label: &str, fo2: f64, fhe: f64);

    /// declare a decompression mix under a label
    fn add_deco_gas(&mut self, label: &str, fo2: f64, fhe: f64);

    /// level exposure at depth
    fn add_flat(&mut self, depth: Depth, gas: &str, time: Time) -> Result<(), PlanError>;

    /// linear travel between depths
    fn add_depth_change(
        &mut self,
        start_depth: Depth,
        end_depth: Depth,
        gas: &str,
        time: Time,
    ) -> Result<(), PlanError>;

    /// segments recorded so far
    fn segments(&self) -> &[Segment];

    /// full schedule: recorded dive plus computed ascent legs and stops
    fn calculate_decompression(&mut self, params: &DecoParams) -> Result<DecoSchedule, DecoError>;

    /// no-decompression limit at depth on a gas; `Ok(None)` when saturation
    /// is reached without a deco obligation
    fn ndl(
        &mut self,
        depth: Depth,
        gas: &str,
        gf: GradientFactor,
    ) -> Result<Option<Time>, PlanError>;
}

/// Labelled mixes in declaration order, so "best gas" ties resolve to the
/// first one declared and numbering schemes stay stable.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) struct GasBank {
    gases: Vec<(String, Gas)>,
}

impl GasBank {
    pub fn insert(&mut self, label: &str, gas: Gas) {
        if let Some(existing) = self.gases.iter_mut().find(|(l, _)| l == label) {
            existing.1 = gas;
            return;
        }
        self.gases.push((label.to_string(), gas));
    }

    pub fn get(&self, label: &str) -> Option<Gas> {
        self.gases
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, gas)| *gas)
    }

    /// Highest-fO2 mix usable at depth: MOD (rounded up to the next whole
    /// meter) at or below the ppO2 limit, END within the narcotic limit.
    pub fn best_gas_at(
        &self,
        depth: Depth,
        max_ppo2: Pressure,
        max_end: Depth,
        environment: &Environment,
        fresh_water: bool,
    ) -> Option<(String, Gas)> {
        let mut best: Option<(String, Gas)> = None;
        for (label, gas) in self.gases.iter() {
            let gas_mod = gas.max_operating_depth(max_ppo2, environment, fresh_water);
            let rounded_mod = Depth::from_meters(math_utils::ceil(gas_mod.as_meters()));
            let gas_end = gas.equivalent_narcotic_depth(depth, environment, fresh_water);
            if depth <= rounded_mod && gas_end <= max_end {
                let better = match &best {
                    Some((_, current)) => gas.fo2() > current.fo2(),
                    None => true,
                };
                if better {
                    best = Some((label.clone(), *gas));
                }
            }
        }
        best
    }
}
