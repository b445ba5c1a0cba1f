use crate::common::math_utils;
use crate::common::{
    collapse_segments, DecoError, DecoSchedule, DecoWarning, Depth, Gas, PlanError, Segment, Time,
};
use crate::vpm::engine::VpmEngine;
use crate::vpm::settings::{AltitudeSettings, Units, VpmSettings};
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One declared breathing mix, all three fractions spelled out.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GasSummary {
    pub fraction_o2: f64,
    pub fraction_n2: f64,
    pub fraction_he: f64,
}

/// One profile entry. Code 1 is a descent/ascent leg, code 2 a level segment
/// with its run time at the end, code 99 ends the dive profile and may
/// override the ascent rate and stop step size.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileCode {
    pub profile_code: i32,
    pub starting_depth: Option<f64>,
    pub ending_depth: Option<f64>,
    pub rate: Option<f64>,
    pub gasmix: Option<usize>,
    pub depth: Option<f64>,
    pub run_time_at_end_of_segment: Option<f64>,
    pub step_size: Option<f64>,
}

impl ProfileCode {
    pub fn ascent_descent(starting_depth: f64, ending_depth: f64, rate: f64, gasmix: usize) -> Self {
        Self {
            profile_code: 1,
            starting_depth: Some(starting_depth),
            ending_depth: Some(ending_depth),
            rate: Some(rate),
            gasmix: Some(gasmix),
            depth: None,
            run_time_at_end_of_segment: None,
            step_size: None,
        }
    }

    pub fn constant_depth(depth: f64, run_time_at_end_of_segment: f64, gasmix: usize) -> Self {
        Self {
            profile_code: 2,
            starting_depth: None,
            ending_depth: None,
            rate: None,
            gasmix: Some(gasmix),
            depth: Some(depth),
            run_time_at_end_of_segment: Some(run_time_at_end_of_segment),
            step_size: None,
        }
    }

    pub fn decompress() -> Self {
        Self {
            profile_code: 99,
            starting_depth: None,
            ending_depth: None,
            rate: None,
            gasmix: None,
            depth: None,
            run_time_at_end_of_segment: None,
            step_size: None,
        }
    }

    pub fn with_ascent_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = Some(step_size);
        self
    }
}

/// A planned switch to another declared mix on the way up.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GasSwitch {
    pub depth: f64,
    pub gasmix: usize,
}

/// One dive of a (possibly repetitive) series.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiveInput {
    pub desc: String,
    pub num_gas_mixes: usize,
    pub gasmix_summary: Vec<GasSummary>,
    pub profile_codes: Vec<ProfileCode>,
    pub gas_switches: Vec<GasSwitch>,
    pub repetitive_code: i32,
    pub surface_interval_time_minutes: Option<f64>,
}

/// Full configuration record for a [`DiveState`] run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VpmConfig {
    pub input: Vec<DiveInput>,
    pub altitude: AltitudeSettings,
    pub settings: VpmSettings,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiveResult {
    pub desc: String,
    pub schedule: DecoSchedule,
}

/// Drives the bubble model through a configured series of dives, the way the
/// reference program consumes its input file.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiveState {
    config: VpmConfig,
}

impl DiveState {
    pub fn new(config: VpmConfig) -> Result<Self, DecoError> {
        config.settings.validate()?;
        config.altitude.validate(config.settings.units)?;
        for dive in &config.input {
            if dive.num_gas_mixes != dive.gasmix_summary.len() {
                return Err(PlanError::GasMixNumberOutOfRange {
                    number: dive.num_gas_mixes,
                    available: dive.gasmix_summary.len(),
                }
                .into());
            }
            for mix in &dive.gasmix_summary {
                Gas::from_fractions(mix.fraction_o2, mix.fraction_n2, mix.fraction_he)?;
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &VpmConfig {
        &self.config
    }

    pub fn run(&mut self) -> Result<Vec<DiveResult>, DecoError> {
        let settings = self.config.settings;
        let units = settings.units;
        let sea_level = units.units_factor();
        let mut engine = VpmEngine::new(settings, sea_level);
        if settings.altitude_dive_algorithm {
            engine.vpm_altitude_dive_algorithm(&self.config.altitude);
        }

        let mut results = Vec::with_capacity(self.config.input.len());
        for dive in &self.config.input {
            engine.start_new_dive();
            let result = Self::run_single_dive(&mut engine, dive, &settings)?;
            results.push(result);

            match dive.repetitive_code {
                0 => {
                    // next dive starts from scratch
                    engine = VpmEngine::new(settings, sea_level);
                    if settings.altitude_dive_algorithm {
                        engine.vpm_altitude_dive_algorithm(&self.config.altitude);
                    }
                }
                1 => {
                    let interval = dive
                        .surface_interval_time_minutes
                        .ok_or(PlanError::MissingSurfaceInterval)?;
                    engine.gas_loadings_surface_interval(interval);
                    engine.vpm_repetitive_algorithm(interval);
                }
                other => return Err(PlanError::InvalidRepetitiveFlag(other).into()),
            }
        }
        Ok(results)
    }

    fn run_single_dive(
        engine: &mut VpmEngine,
        dive: &DiveInput,
        settings: &VpmSettings,
    ) -> Result<DiveResult, DecoError> {
        let units = settings.units;
        let mixes: Vec<Gas> = dive
            .gasmix_summary
            .iter()
            .map(|mix| Gas::from_fractions(mix.fraction_o2, mix.fraction_n2, mix.fraction_he))
            .collect::<Result<_, _>>()?;
        let labels: Vec<String> = mixes.iter().map(|gas| gas.id()).collect();
        let resolve = |gasmix: Option<usize>, code: i32| -> Result<usize, PlanError> {
            let number = gasmix.ok_or(PlanError::InvalidProfileCode(code))?;
            if number == 0 || number > mixes.len() {
                return Err(PlanError::GasMixNumberOutOfRange {
                    number,
                    available: mixes.len(),
                });
            }
            Ok(number - 1)
        };

        let mut raw_segments: Vec<(f64, f64, usize, f64)> = Vec::new();
        let mut current_depth = 0.;
        let mut current_mix = 0;
        let mut deco_rate = settings.deco_ascent_rate;
        let mut step_size = settings.deco_step_size;

        for entry in &dive.profile_codes {
            match entry.profile_code {
                1 => {
                    let mix = resolve(entry.gasmix, 1)?;
                    let (starting, ending, rate) =
                        match (entry.starting_depth, entry.ending_depth, entry.rate) {
                            (Some(s), Some(e), Some(r)) if r != 0. => (s, e, r),
                            _ => return Err(PlanError::InvalidProfileCode(1).into()),
                        };
                    let time = engine.ascent_descent(starting, ending, rate, &mixes[mix])?;
                    raw_segments.push((starting, ending, mix, time));
                    current_depth = ending;
                    current_mix = mix;
                }
                2 => {
                    let mix = resolve(entry.gasmix, 2)?;
                    let (depth, run_time) =
                        match (entry.depth, entry.run_time_at_end_of_segment) {
                            (Some(d), Some(t)) => (d, t),
                            _ => return Err(PlanError::InvalidProfileCode(2).into()),
                        };
                    let duration = run_time - engine.run_time;
                    if duration < 0. {
                        return Err(PlanError::InvalidProfileCode(2).into());
                    }
                    engine.constant_depth(depth, duration, &mixes[mix]);
                    raw_segments.push((depth, depth, mix, duration));
                    current_depth = depth;
                    current_mix = mix;
                }
                99 => {
                    if let Some(rate) = entry.rate {
                        deco_rate = math_utils::abs(rate);
                    }
                    if let Some(step) = entry.step_size {
                        step_size = step;
                    }
                    break;
                }
                other => return Err(PlanError::InvalidProfileCode(other).into()),
            }
        }

        for switch in &dive.gas_switches {
            if switch.gasmix == 0 || switch.gasmix > mixes.len() {
                return Err(PlanError::GasMixNumberOutOfRange {
                    number: switch.gasmix,
                    available: mixes.len(),
                }
                .into());
            }
        }
        let switches = &dive.gas_switches;
        let mixes_for_choice = mixes.clone();
        let labels_for_choice = labels.clone();
        let choose_gas = move |depth_units: f64, current: &Gas| {
            // deepest-first: the active mix is the shallowest-activating
            // switch already reached on the way up
            let mut active: Option<usize> = None;
            let mut active_depth = f64::MAX;
            for switch in switches {
                if switch.depth >= depth_units && switch.depth < active_depth {
                    active = Some(switch.gasmix - 1);
                    active_depth = switch.depth;
                }
            }
            active
                .map(|mix| (labels_for_choice[mix].clone(), mixes_for_choice[mix]))
                .filter(|(_, gas)| gas != current)
        };

        let outcome = engine.decompress(
            current_depth,
            (labels[current_mix].clone(), mixes[current_mix]),
            deco_rate,
            step_size,
            choose_gas,
        )?;

        let to_depth = |value: f64| match units {
            Units::Msw => Depth::from_meters(value),
            Units::Fsw => Depth::from_feet(value),
        };
        let mut segments: Vec<Segment> = raw_segments
            .into_iter()
            .map(|(start, end, mix, minutes)| Segment {
                start_depth: to_depth(start),
                end_depth: to_depth(end),
                gas: labels[mix].clone(),
                time: Time::from_minutes(minutes),
            })
            .collect();
        for leg in &outcome.legs {
            segments.push(Segment {
                start_depth: to_depth(leg.start),
                end_depth: to_depth(leg.end),
                gas: leg.label.clone(),
                time: Time::from_minutes(leg.minutes),
            });
        }
        let mut warnings = Vec::new();
        if let Some(at) = outcome.zone_clamped_at {
            warnings.push(DecoWarning::StartOfDecoZoneClamped {
                depth_meters: to_depth(at).as_meters(),
            });
        }

        Ok(DiveResult {
            desc: dive.desc.clone(),
            schedule: DecoSchedule {
                segments: collapse_segments(segments),
                warnings,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ConfigError;
    use alloc::string::ToString;
    use alloc::vec;

    fn air_mix() -> GasSummary {
        GasSummary {
            fraction_o2: 0.21,
            fraction_n2: 0.79,
            fraction_he: 0.,
        }
    }

    fn single_air_dive(depth: f64, run_time: f64) -> DiveInput {
        DiveInput {
            desc: "air dive".to_string(),
            num_gas_mixes: 1,
            gasmix_summary: vec![air_mix()],
            profile_codes: vec![
                ProfileCode::ascent_descent(0., depth, 20., 1),
                ProfileCode::constant_depth(depth, run_time, 1),
                ProfileCode::decompress(),
            ],
            gas_switches: vec![],
            repetitive_code: 0,
            surface_interval_time_minutes: None,
        }
    }

    fn config(input: Vec<DiveInput>) -> VpmConfig {
        VpmConfig {
            input,
            altitude: AltitudeSettings::default(),
            settings: VpmSettings::default(),
        }
    }

    #[test]
    fn test_gas_sum_validation() {
        let mut dive = single_air_dive(30., 25.);
        dive.gasmix_summary[0].fraction_o2 = 0.22;
        let res = DiveState::new(config(vec![dive]));
        assert!(matches!(
            res,
            Err(DecoError::Config(ConfigError::GasFractionsSum { .. }))
        ));
    }

    #[test]
    fn test_invalid_profile_code() {
        let mut dive = single_air_dive(30., 25.);
        dive.profile_codes[1].profile_code = 3;
        let mut state = DiveState::new(config(vec![dive])).unwrap();
        assert_eq!(
            state.run(),
            Err(PlanError::InvalidProfileCode(3).into())
        );
    }

    #[test]
    fn test_invalid_repetitive_flag() {
        let mut dive = single_air_dive(30., 25.);
        dive.repetitive_code = 2;
        let mut state = DiveState::new(config(vec![dive])).unwrap();
        assert_eq!(state.run(), Err(PlanError::InvalidRepetitiveFlag(2).into()));
    }

    #[test]
    fn test_missing_surface_interval() {
        let mut first = single_air_dive(30., 20.);
        first.repetitive_code = 1;
        let second = single_air_dive(20., 30.);
        let mut state = DiveState::new(config(vec![first, second])).unwrap();
        assert_eq!(state.run(), Err(PlanError::MissingSurfaceInterval.into()));
    }

    #[test]
    fn test_single_dive_produces_schedule() {
        let mut state = DiveState::new(config(vec![single_air_dive(42., 30.)])).unwrap();
        let results = state.run().unwrap();
        assert_eq!(results.len(), 1);
        let schedule = &results[0].schedule;
        assert_eq!(schedule.segments.last().unwrap().end_depth, Depth::zero());
        assert!(schedule.runtime() > Time::from_minutes(30.));
    }

    #[test]
    fn test_repetitive_dive_is_more_constrained() {
        let mut first = single_air_dive(40., 25.);
        first.repetitive_code = 1;
        first.surface_interval_time_minutes = Some(60.);
        let second = single_air_dive(40., 25.);

        let mut series = DiveState::new(config(vec![first, second])).unwrap();
        let results = series.run().unwrap();
        let first_runtime = results[0].schedule.runtime();
        let second_runtime = results[1].schedule.runtime();
        assert!(second_runtime >= first_runtime);
    }

    #[test]
    fn test_gasmix_number_out_of_range() {
        let mut dive = single_air_dive(30., 25.);
        dive.profile_codes[0].gasmix = Some(2);
        let mut state = DiveState::new(config(vec![dive])).unwrap();
        assert!(matches!(
            state.run(),
            Err(DecoError::Plan(PlanError::GasMixNumberOutOfRange { .. }))
        ));
    }
}
