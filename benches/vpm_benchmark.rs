use criterion::{criterion_group, criterion_main, Criterion};
use dive_plan::{DecoParams, DecoPlan, Depth, Time, VpmPlan};

fn trimix_plan() -> VpmPlan {
    let mut plan = VpmPlan::new(false, 1.);
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
    plan
}

pub fn vpm_deco_benchmark(c: &mut Criterion) {
    let mut plan = trimix_plan();
    let params = DecoParams::default();
    c.bench_function("VPM-B deco", |b| {
        b.iter(|| plan.calculate_decompression(&params).unwrap())
    });
}

criterion_group!(benches, vpm_deco_benchmark);
criterion_main!(benches);
