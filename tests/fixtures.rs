use dive_plan::{BuhlmannPlan, DecoParams, Depth, VpmPlan, ZH16B_TISSUES};

pub fn buhlmann_plan() -> BuhlmannPlan {
    BuhlmannPlan::new(ZH16B_TISSUES, 1., false)
}

pub fn vpm_plan() -> VpmPlan {
    VpmPlan::new(false, 1.)
}

pub fn trimix_deco_params() -> DecoParams {
    DecoParams::new()
        .with_gradient_factors(0.2, 0.8)
        .with_max_ppo2(1.6)
        .with_max_end(Depth::from_meters(30.))
}

#[macro_export]
macro_rules! assert_close_to_abs {
    ($a:expr, $b:expr, $tolerance:expr) => {
        if ($a - $b).abs() > $tolerance {
            panic!("{} is not close to {} with tolerance of {}", $a, $b, $tolerance);
        }
    };
}

#[macro_export]
macro_rules! assert_close_to_percent {
    ($a:expr, $b:expr, $tolerance_percent:expr) => {
        let tolerance = $b * ($tolerance_percent / 100.0);
        if ($a - $b).abs() > tolerance {
            panic!(
                "{} is not close to {} within {} percent tolerance ({})",
                $a, $b, $tolerance_percent, tolerance
            );
        }
    };
}
