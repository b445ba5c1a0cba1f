use crate::common::{
    collapse_segments, ConfigError, DecoError, DecoParams, DecoPlan, DecoSchedule, DecoWarning,
    Depth, Environment, Gas, GasBank, GradientFactor, PlanError, Pressure, Segment, Time,
};
use crate::vpm::compartment::VpmCompartment;
use crate::vpm::engine::VpmEngine;
use crate::vpm::settings::{AltitudeSettings, Units, VpmSettings};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const ATM_BAR: f64 = 1.01325;

/// VPM-B plan over the unified segment builder.
///
/// Segments are recorded up front and replayed through the bubble model when
/// the schedule is requested, so repeated calculations always start from the
/// same starting state. With `maintain_tissues` the end-of-schedule
/// compartment state is kept and exposed through [`VpmPlan::tissues`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VpmPlan {
    fresh_water: bool,
    abs_pressure: Pressure,
    environment: Environment,
    settings: VpmSettings,
    altitude: Option<AltitudeSettings>,
    bottom_gases: GasBank,
    deco_gases: GasBank,
    segments: Vec<Segment>,
    engine: VpmEngine,
    maintained: Option<VpmEngine>,
}

impl VpmPlan {
    pub fn new(fresh_water: bool, abs_pressure: Pressure) -> Self {
        let settings = VpmSettings::default();
        let environment = Environment::default()
            .with_surface_pressure(abs_pressure)
            .with_altitude_pressure(abs_pressure);
        let engine = Self::build_engine(settings, &None, abs_pressure);
        Self {
            fresh_water,
            abs_pressure,
            environment,
            settings,
            altitude: None,
            bottom_gases: GasBank::default(),
            deco_gases: GasBank::default(),
            segments: Vec::new(),
            engine,
            maintained: None,
        }
    }

    pub fn with_settings(mut self, settings: VpmSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        if let Some(altitude) = &self.altitude {
            altitude.validate(settings.units)?;
        }
        self.settings = settings;
        self.engine = Self::build_engine(settings, &self.altitude, self.abs_pressure);
        Ok(self)
    }

    pub fn with_altitude(mut self, altitude: AltitudeSettings) -> Result<Self, ConfigError> {
        altitude.validate(self.settings.units)?;
        self.altitude = Some(altitude);
        self.engine = Self::build_engine(self.settings, &self.altitude, self.abs_pressure);
        Ok(self)
    }

    pub fn settings(&self) -> VpmSettings {
        self.settings
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// compartment state: the maintained end-of-schedule state when one was
    /// requested, the starting state otherwise
    pub fn tissues(&self) -> Vec<VpmCompartment> {
        self.maintained
            .as_ref()
            .unwrap_or(&self.engine)
            .compartments
            .clone()
    }

    fn build_engine(
        settings: VpmSettings,
        altitude: &Option<AltitudeSettings>,
        abs_pressure: Pressure,
    ) -> VpmEngine {
        let barometric = abs_pressure * settings.units.units_factor() / ATM_BAR;
        let mut engine = VpmEngine::new(settings, barometric);
        if settings.altitude_dive_algorithm {
            if let Some(altitude) = altitude {
                engine.vpm_altitude_dive_algorithm(altitude);
            }
        }
        engine
    }

    fn depth_to_units(&self, depth: Depth) -> f64 {
        match self.settings.units {
            Units::Msw => depth.as_meters(),
            Units::Fsw => depth.as_feet(),
        }
    }

    fn units_to_depth(&self, units: f64) -> Depth {
        match self.settings.units {
            Units::Msw => Depth::from_meters(units),
            Units::Fsw => Depth::from_feet(units),
        }
    }

    fn lookup_gas(&self, label: &str) -> Result<Gas, PlanError> {
        self.bottom_gases
            .get(label)
            .or_else(|| self.deco_gases.get(label))
            .ok_or_else(|| PlanError::UnknownGas(label.to_string()))
    }

    fn replay_profile(&self, work: &mut VpmEngine) -> Result<(), DecoError> {
        for segment in &self.segments {
            let gas = self.lookup_gas(&segment.gas)?;
            let minutes = segment.time.as_minutes();
            if minutes <= 0. {
                continue;
            }
            let start = self.depth_to_units(segment.start_depth);
            let end = self.depth_to_units(segment.end_depth);
            if start == end {
                work.constant_depth(start, minutes, &gas);
            } else {
                let rate = (end - start) / minutes;
                work.ascent_descent(start, end, rate, &gas)?;
            }
        }
        Ok(())
    }
}

impl DecoPlan for VpmPlan {
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
        self.lookup_gas(gas)?;
        self.segments
            .push(Segment::travel(start_depth, end_depth, gas.to_string(), time));
        Ok(())
    }

    fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn calculate_decompression(&mut self, params: &DecoParams) -> Result<DecoSchedule, DecoError> {
        let from_depth = match params.from_depth {
            Some(depth) => depth,
            None => match self.segments.last() {
                Some(segment) => segment.end_depth,
                None => return Err(PlanError::NothingToDecompressFrom.into()),
            },
        };
        let gas_label = match self.segments.last() {
            Some(segment) => segment.gas.clone(),
            None => match self.deco_gases.best_gas_at(
                from_depth,
                params.max_ppo2,
                params.max_end,
                &self.environment,
                self.fresh_water,
            ) {
                Some((label, _)) => label,
                None => {
                    return Err(PlanError::NoUsableDecoGas {
                        depth_meters: from_depth.as_meters(),
                    }
                    .into())
                }
            },
        };
        let starting_gas = self.lookup_gas(&gas_label)?;

        let mut work = self.engine.clone();
        work.start_new_dive();
        self.replay_profile(&mut work)?;

        let deco_gases = self.deco_gases.clone();
        let environment = self.environment;
        let fresh_water = self.fresh_water;
        let units = self.settings.units;
        let choose_gas = |depth_units: f64, current: &Gas| {
            let depth = match units {
                Units::Msw => Depth::from_meters(depth_units),
                Units::Fsw => Depth::from_feet(depth_units),
            };
            deco_gases
                .best_gas_at(depth, params.max_ppo2, params.max_end, &environment, fresh_water)
                .filter(|(_, gas)| gas != current)
        };

        let outcome = work.decompress(
            self.depth_to_units(from_depth),
            (gas_label, starting_gas),
            self.settings.deco_ascent_rate,
            self.settings.deco_step_size,
            choose_gas,
        )?;

        let mut all_segments = self.segments.clone();
        for leg in &outcome.legs {
            all_segments.push(Segment {
                start_depth: self.units_to_depth(leg.start),
                end_depth: self.units_to_depth(leg.end),
                gas: leg.label.clone(),
                time: Time::from_minutes(leg.minutes),
            });
        }
        let warnings = outcome
            .zone_clamped_at
            .map(|units| {
                let mut w = Vec::new();
                w.push(DecoWarning::StartOfDecoZoneClamped {
                    depth_meters: self.units_to_depth(units).as_meters(),
                });
                w
            })
            .unwrap_or_default();

        if params.maintain_tissues {
            self.maintained = Some(work);
        }

        Ok(DecoSchedule {
            segments: collapse_segments(all_segments),
            warnings,
        })
    }

    fn ndl(
        &mut self,
        _depth: Depth,
        _gas: &str,
        _gf: GradientFactor,
    ) -> Result<Option<Time>, PlanError> {
        Err(PlanError::Unsupported("ndl"))
    }
}
