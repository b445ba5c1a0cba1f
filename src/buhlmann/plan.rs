use crate::buhlmann::compartment::BuhlmannCompartment;
use crate::buhlmann::zhl_values::ZhlTable;
use crate::common::math_utils;
use crate::common::{
    collapse_segments, AscentRatePerMinute, ConfigError, DecoError, DecoParams, DecoPlan,
    DecoSchedule, Depth, Environment, Gas, GasBank, GradientFactor, NumericError, PlanError,
    Pressure, Segment, Time,
};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const DECO_ASCENT_RATE: AscentRatePerMinute = 10.;
const STOP_WINDOW_METERS: f64 = 3.;
const MAX_STOP_MINUTES: u32 = 10_000;

/// Buhlmann ZH-L16 plan with gradient factors.
///
/// Owns the declared gas banks, the recorded dive segments and the 17
/// compartments loaded from them. `calculate_decompression` searches an
/// ascent schedule against GF-weighted M-values.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BuhlmannPlan {
    fresh_water: bool,
    environment: Environment,
    bottom_gases: GasBank,
    deco_gases: GasBank,
    segments: Vec<Segment>,
    compartments: Vec<BuhlmannCompartment>,
}

impl BuhlmannPlan {
    pub fn new(table: ZhlTable, abs_pressure: Pressure, fresh_water: bool) -> Self {
        let environment = Environment::default()
            .with_surface_pressure(abs_pressure)
            .with_altitude_pressure(abs_pressure);
        let compartments = table
            .iter()
            .map(|params| BuhlmannCompartment::new(*params, abs_pressure))
            .collect();
        Self {
            fresh_water,
            environment,
            bottom_gases: GasBank::default(),
            deco_gases: GasBank::default(),
            segments: Vec::new(),
            compartments,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn tissues(&self) -> Vec<BuhlmannCompartment> {
        self.compartments.clone()
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Deco ceiling across all compartments, rounded up to the next 3 m stop.
    pub fn ceiling(&self, gf: GradientFactor) -> Depth {
        let mut deepest = Depth::zero();
        for compartment in &self.compartments {
            let ceiling = compartment.ceiling(gf, &self.environment, self.fresh_water);
            if ceiling > deepest {
                deepest = ceiling;
            }
        }
        Depth::from_meters(
            STOP_WINDOW_METERS * math_utils::ceil(deepest.as_meters() / STOP_WINDOW_METERS),
        )
    }

    fn lookup_gas(&self, label: &str) -> Result<Gas, PlanError> {
        self.bottom_gases
            .get(label)
            .or_else(|| self.deco_gases.get(label))
            .ok_or_else(|| PlanError::UnknownGas(label.to_string()))
    }

    fn load_compartments(
        &mut self,
        start_depth: Depth,
        end_depth: Depth,
        gas: &Gas,
        time: Time,
    ) -> Pressure {
        let mut total_change = 0.;
        for compartment in self.compartments.iter_mut() {
            let delta = compartment.add_depth_change(
                start_depth,
                end_depth,
                gas,
                time,
                &self.environment,
                self.fresh_water,
            );
            total_change += math_utils::abs(delta);
        }
        total_change
    }

    fn best_deco_gas(&self, depth: Depth, params: &DecoParams) -> Option<(String, Gas)> {
        self.deco_gases.best_gas_at(
            depth,
            params.max_ppo2,
            params.max_end,
            &self.environment,
            self.fresh_water,
        )
    }

    /// Ascend one meter at a time looking for a better deco mix, travelling
    /// each leg at the deco ascent rate and switching where a richer mix
    /// becomes usable.
    fn add_deco_depth_change(
        &mut self,
        out: &mut Vec<Segment>,
        from_depth: Depth,
        to_depth: Depth,
        gas_label: &mut String,
        params: &DecoParams,
    ) -> Result<(), DecoError> {
        let mut current = from_depth;
        while current > to_depth {
            let mut leg_end = to_depth;
            let mut switch_to: Option<String> = None;
            let mut probe = current;
            while probe > to_depth {
                let next = Depth::from_meters((probe.as_meters() - 1.).max(to_depth.as_meters()));
                if let Some((label, _)) = self.best_deco_gas(next, params) {
                    if label != *gas_label {
                        leg_end = next;
                        switch_to = Some(label);
                        break;
                    }
                }
                probe = next;
            }

            let gas = self.lookup_gas(gas_label)?;
            let time =
                Time::from_minutes((current - leg_end).as_meters() / DECO_ASCENT_RATE);
            self.load_compartments(current, leg_end, &gas, time);
            out.push(Segment::travel(current, leg_end, gas_label.clone(), time));

            if let Some(label) = switch_to {
                *gas_label = label;
            }
            current = leg_end;
        }
        Ok(())
    }
}

impl DecoPlan for BuhlmannPlan {
    fn add_bottom_gas(&mut self, label: &str, fo2: f64, fhe: f64) {
        self.bottom_gases.insert(label, Gas::new(fo2, fhe));
    }

    fn add_deco_gas(&mut self, label: &str, fo2: f64, fhe: f64) {
        self.deco_gases.insert(label, Gas::new(fo2, fhe));
    }

    fn add_flat(&mut self, depth: Depth, gas: &str, time: Time) -> Result<(), PlanError> {
        self.add_depth_change(depth, depth, gas, time)
    }

    fn add_depth_change(
        &mut self,
        start_depth: Depth,
        end_depth: Depth,
        gas: &str,
        time: Time,
    ) -> Result<(), PlanError> {
        let mix = self.lookup_gas(gas)?;
        self.load_compartments(start_depth, end_depth, &mix, time);
        self.segments
            .push(Segment::travel(start_depth, end_depth, gas.to_string(), time));
        Ok(())
    }

    fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn calculate_decompression(&mut self, params: &DecoParams) -> Result<DecoSchedule, DecoError> {
        if params.gf_low <= 0. {
            return Err(ConfigError::GradientFactorOutOfRange { gf: params.gf_low }.into());
        }
        if params.gf_high <= 0. {
            return Err(ConfigError::GradientFactorOutOfRange { gf: params.gf_high }.into());
        }

        let from_depth = match params.from_depth {
            Some(depth) => depth,
            None => match self.segments.last() {
                Some(segment) => segment.end_depth,
                None => return Err(PlanError::NothingToDecompressFrom.into()),
            },
        };
        let mut gas_label = match self.segments.last() {
            Some(segment) => segment.gas.clone(),
            None => match self.best_deco_gas(from_depth, params) {
                Some((label, _)) => label,
                None => {
                    return Err(PlanError::NoUsableDecoGas {
                        depth_meters: from_depth.as_meters(),
                    }
                    .into())
                }
            },
        };

        let snapshot = (!params.maintain_tissues).then(|| self.compartments.clone());
        let result = self.run_deco_search(from_depth, &mut gas_label, params);
        if let Some(saved) = snapshot {
            self.compartments = saved;
        }

        let deco_segments = result?;
        let mut all_segments = self.segments.clone();
        all_segments.extend(deco_segments);
        Ok(DecoSchedule {
            segments: collapse_segments(all_segments),
            warnings: Vec::new(),
        })
    }

    fn ndl(
        &mut self,
        depth: Depth,
        gas: &str,
        gf: GradientFactor,
    ) -> Result<Option<Time>, PlanError> {
        let mix = self.lookup_gas(gas)?;
        let snapshot = self.compartments.clone();

        let mut minutes = 0u32;
        let limit = loop {
            let change = self.load_compartments(depth, depth, &mix, Time::from_minutes(1.));
            if self.ceiling(gf) > Depth::zero() {
                break Some(Time::from_minutes(minutes as f64));
            }
            minutes += 1;
            if change == 0. {
                break None;
            }
        };

        self.compartments = snapshot;
        Ok(limit)
    }
}

impl BuhlmannPlan {
    fn run_deco_search(
        &mut self,
        from_depth: Depth,
        gas_label: &mut String,
        params: &DecoParams,
    ) -> Result<Vec<Segment>, DecoError> {
        let mut out: Vec<Segment> = Vec::new();
        let mut ceiling = self.ceiling(params.gf_low);

        self.add_deco_depth_change(&mut out, from_depth, ceiling, gas_label, params)?;

        while ceiling > Depth::zero() {
            let stop_depth = ceiling;
            let mut minutes = 0u32;
            loop {
                let gas = self.lookup_gas(gas_label)?;
                self.load_compartments(stop_depth, stop_depth, &gas, Time::from_minutes(1.));
                out.push(Segment::flat(
                    stop_depth,
                    gas_label.clone(),
                    Time::from_minutes(1.),
                ));
                minutes += 1;

                let gf = params.gf_low
                    + (params.gf_high - params.gf_low)
                        * (1. - ceiling.as_meters() / from_depth.as_meters());
                ceiling = self.ceiling(gf);
                if ceiling.as_meters() <= stop_depth.as_meters() - STOP_WINDOW_METERS {
                    break;
                }
                if minutes >= MAX_STOP_MINUTES {
                    return Err(NumericError::OffGassingGradientTooSmall {
                        depth_meters: stop_depth.as_meters(),
                    }
                    .into());
                }
            }
            self.add_deco_depth_change(&mut out, stop_depth, ceiling, gas_label, params)?;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buhlmann::zhl_values::ZH16B_TISSUES;

    fn plan() -> BuhlmannPlan {
        BuhlmannPlan::new(ZH16B_TISSUES, 1., false)
    }

    #[test]
    fn test_surface_ceiling_is_clear() {
        let plan = plan();
        assert_eq!(plan.ceiling(1.), Depth::zero());
    }

    #[test]
    fn test_unknown_gas_rejected() {
        let mut plan = plan();
        let res = plan.add_flat(Depth::from_meters(10.), "air", Time::from_minutes(10.));
        assert_eq!(res, Err(PlanError::UnknownGas("air".to_string())));
    }

    #[test]
    fn test_no_starting_point_rejected() {
        let mut plan = plan();
        plan.add_bottom_gas("air", 0.21, 0.);
        let res = plan.calculate_decompression(&DecoParams::default());
        assert_eq!(res, Err(PlanError::NothingToDecompressFrom.into()));
    }

    #[test]
    fn test_ceiling_appears_after_deep_exposure() {
        let mut plan = plan();
        plan.add_bottom_gas("air", 0.21, 0.);
        plan.add_depth_change(
            Depth::zero(),
            Depth::from_meters(40.),
            "air",
            Time::from_minutes(4.),
        )
        .unwrap();
        plan.add_flat(Depth::from_meters(40.), "air", Time::from_minutes(30.))
            .unwrap();
        let ceiling = plan.ceiling(0.8);
        assert!(ceiling > Depth::zero());
        assert_eq!(ceiling.as_meters() % 3., 0.);
    }

    #[test]
    fn test_gf_interpolation_bounds() {
        // ceiling at the surface means gf_high applies, first stop means gf_low
        let mut plan = plan();
        plan.add_bottom_gas("air", 0.21, 0.);
        plan.add_depth_change(
            Depth::zero(),
            Depth::from_meters(45.),
            "air",
            Time::from_minutes(4.),
        )
        .unwrap();
        plan.add_flat(Depth::from_meters(45.), "air", Time::from_minutes(30.))
            .unwrap();
        let conservative = plan.ceiling(0.3);
        let permissive = plan.ceiling(1.);
        assert!(conservative >= permissive);
    }

    #[test]
    fn test_ndl_zero_when_already_in_deco() {
        let mut plan = plan();
        plan.add_bottom_gas("air", 0.21, 0.);
        plan.add_flat(Depth::from_meters(40.), "air", Time::from_minutes(40.))
            .unwrap();
        let ndl = plan.ndl(Depth::from_meters(40.), "air", 1.).unwrap();
        assert_eq!(ndl, Some(Time::zero()));
    }

    #[test]
    fn test_ndl_sentinel_at_trivial_depth() {
        let mut plan = plan();
        plan.add_bottom_gas("air", 0.21, 0.);
        let ndl = plan.ndl(Depth::from_meters(1.), "air", 1.).unwrap();
        assert_eq!(ndl, None);
    }
}
