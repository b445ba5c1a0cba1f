use dive_plan::{
    ConfigError, DecoError, DecoParams, DecoPlan, Depth, DiveInput, DiveState, GasSummary,
    PlanError, ProfileCode, Time, Units, VpmConfig, VpmSettings,
};
pub mod fixtures;

fn record_trimix_profile(plan: &mut impl DecoPlan) {
    plan.add_bottom_gas("2135", 0.21, 0.35);
    plan.add_deco_gas("50%", 0.5, 0.);
    plan.add_depth_change(
        Depth::zero(),
        Depth::from_meters(50.),
        "2135",
        Time::from_minutes(5.),
    )
    .unwrap();
    plan.add_flat(Depth::from_meters(50.), "2135", Time::from_minutes(25.))
        .unwrap();
}

#[test]
fn test_vpm_more_conservative_than_full_m_value_buhlmann() {
    let mut vpm = fixtures::vpm_plan();
    record_trimix_profile(&mut vpm);
    let vpm_schedule = vpm.calculate_decompression(&DecoParams::default()).unwrap();

    let mut buhlmann = fixtures::buhlmann_plan();
    record_trimix_profile(&mut buhlmann);
    let buhlmann_schedule = buhlmann
        .calculate_decompression(&DecoParams::new().with_gradient_factors(1., 1.))
        .unwrap();

    assert!(
        vpm_schedule.runtime() > buhlmann_schedule.runtime(),
        "vpm {}min vs buhlmann {}min",
        vpm_schedule.runtime().as_minutes(),
        buhlmann_schedule.runtime().as_minutes()
    );

    let vpm_first = vpm_schedule.first_stop().expect("vpm first stop");
    let buhlmann_first = buhlmann_schedule.first_stop().expect("buhlmann first stop");
    assert!(vpm_first >= buhlmann_first);
}

#[test]
fn test_vpm_idempotent_across_evaluations() {
    let mut plan = fixtures::vpm_plan();
    record_trimix_profile(&mut plan);
    let params = DecoParams::default();
    let first = plan.calculate_decompression(&params).unwrap();
    let second = plan.calculate_decompression(&params).unwrap();
    assert_eq!(first.segments, second.segments);
}

#[test]
fn test_vpm_schedule_ends_at_surface() {
    let mut plan = fixtures::vpm_plan();
    record_trimix_profile(&mut plan);
    let schedule = plan.calculate_decompression(&DecoParams::default()).unwrap();
    assert_eq!(schedule.segments.last().unwrap().end_depth, Depth::zero());
    let total: f64 = schedule
        .segments
        .iter()
        .map(|s| s.time.as_minutes())
        .sum();
    assert!(total > 30.);
}

#[test]
fn test_invalid_gas_sum_rejected() {
    let dive = DiveInput {
        desc: "bad mix".into(),
        num_gas_mixes: 1,
        gasmix_summary: vec![GasSummary {
            fraction_o2: 0.22,
            fraction_n2: 0.79,
            fraction_he: 0.,
        }],
        profile_codes: vec![
            ProfileCode::ascent_descent(0., 30., 20., 1),
            ProfileCode::constant_depth(30., 25., 1),
            ProfileCode::decompress(),
        ],
        gas_switches: vec![],
        repetitive_code: 0,
        surface_interval_time_minutes: None,
    };
    let res = DiveState::new(VpmConfig {
        input: vec![dive],
        altitude: Default::default(),
        settings: VpmSettings::default(),
    });
    match res {
        Err(DecoError::Config(ConfigError::GasFractionsSum { sum })) => {
            assert_close_to_abs!(sum, 1.01, 1e-9);
        }
        other => panic!("expected a gas fraction error, got {other:?}"),
    }
}

#[test]
fn test_unknown_units_string_rejected() {
    let res = "feet".parse::<Units>();
    assert_eq!(res, Err(ConfigError::UnknownUnits("feet".into())));
    assert_eq!("fsw".parse::<Units>().unwrap(), Units::Fsw);
}

#[test]
fn test_vpm_ndl_unsupported() {
    let mut plan = fixtures::vpm_plan();
    plan.add_bottom_gas("air", 0.21, 0.);
    assert_eq!(
        plan.ndl(Depth::from_meters(20.), "air", 1.),
        Err(PlanError::Unsupported("ndl"))
    );
}

#[test]
fn test_fsw_plan_matches_msw_shape() {
    let mut msw = fixtures::vpm_plan();
    record_trimix_profile(&mut msw);
    let msw_schedule = msw.calculate_decompression(&DecoParams::default()).unwrap();

    let mut fsw = fixtures::vpm_plan()
        .with_settings(VpmSettings::new(Units::Fsw))
        .unwrap();
    record_trimix_profile(&mut fsw);
    let fsw_schedule = fsw.calculate_decompression(&DecoParams::default()).unwrap();

    // same physics in either unit system: total runtimes land close together
    let msw_minutes = msw_schedule.runtime().as_minutes();
    let fsw_minutes = fsw_schedule.runtime().as_minutes();
    assert_close_to_percent!(fsw_minutes, msw_minutes, 25.);
}

#[test]
fn test_deco_stops_deepen_with_longer_bottom_time() {
    let short = {
        let mut plan = fixtures::vpm_plan();
        plan.add_bottom_gas("2135", 0.21, 0.35);
        plan.add_depth_change(
            Depth::zero(),
            Depth::from_meters(50.),
            "2135",
            Time::from_minutes(5.),
        )
        .unwrap();
        plan.add_flat(Depth::from_meters(50.), "2135", Time::from_minutes(15.))
            .unwrap();
        plan.calculate_decompression(&DecoParams::default()).unwrap()
    };
    let long = {
        let mut plan = fixtures::vpm_plan();
        plan.add_bottom_gas("2135", 0.21, 0.35);
        plan.add_depth_change(
            Depth::zero(),
            Depth::from_meters(50.),
            "2135",
            Time::from_minutes(5.),
        )
        .unwrap();
        plan.add_flat(Depth::from_meters(50.), "2135", Time::from_minutes(35.))
            .unwrap();
        plan.calculate_decompression(&DecoParams::default()).unwrap()
    };
    assert!(long.runtime() > short.runtime());
}
