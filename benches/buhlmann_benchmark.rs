use criterion::{criterion_group, criterion_main, Criterion};
use dive_plan::{BuhlmannPlan, DecoParams, DecoPlan, Depth, Time, ZH16B_TISSUES};

fn trimix_plan() -> BuhlmannPlan {
    let mut plan = BuhlmannPlan::new(ZH16B_TISSUES, 1., false);
    plan.add_bottom_gas("2135", 0.21, 0.35);
    plan.add_deco_gas("50%", 0.5, 0.);
    plan.add_deco_gas("O2", 1., 0.);
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

pub fn buhlmann_ndl_benchmark(c: &mut Criterion) {
    c.bench_function("Buhlmann NDL", |b| {
        b.iter(|| {
            let mut plan = BuhlmannPlan::new(ZH16B_TISSUES, 1., false);
            plan.add_bottom_gas("air", 0.21, 0.);
            plan.ndl(Depth::from_meters(30.), "air", 1.).unwrap()
        })
    });
}

pub fn buhlmann_deco_benchmark(c: &mut Criterion) {
    let mut plan = trimix_plan();
    let params = DecoParams::new().with_gradient_factors(0.2, 0.8);
    c.bench_function("Buhlmann deco", |b| {
        b.iter(|| plan.calculate_decompression(&params).unwrap())
    });
}

criterion_group!(benches, buhlmann_ndl_benchmark, buhlmann_deco_benchmark);
criterion_main!(benches);
