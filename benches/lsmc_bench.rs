use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ferric_storage::core::DailySeries;
use ferric_storage::lsmc::{BasisFunctions, ValuationInputs, ValuationParameters, calculate};
use ferric_storage::models::{MultiFactorParameters, MultiFactorSpotSimulator, SpotSimulator};
use ferric_storage::rates::ContinuousCompoundingDiscounter;
use ferric_storage::storage::{
    CmdtyStorage, FixedSpacingGrid, InjectWithdrawRange, bang_bang_decision_set,
};
use std::hint::black_box;

// Storage valuation benchmarks
// Goals:
// - Full valuation cost should scale roughly linearly in simulations and grid points
// - Design matrix fill should be negligible next to the grid-point loop

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
}

fn benchmark_storage(start: NaiveDate, end: NaiveDate) -> CmdtyStorage {
    CmdtyStorage::builder()
        .active_period(start, end)
        .constant_inject_withdraw_range(-45.5, 56.6)
        .min_inventory(0.0)
        .max_inventory(1000.0)
        .per_unit_injection_cost(0.8, |date| date)
        .no_cmdty_consumed_on_inject()
        .per_unit_withdrawal_cost(1.2, |date| date)
        .no_cmdty_consumed_on_withdraw()
        .fixed_percent_cmdty_inventory_loss(0.0001)
        .no_inventory_cost()
        .must_be_empty_at_end()
        .build()
        .expect("benchmark storage should be valid")
}

fn benchmark_params(num_sims: usize, num_grid_points: usize) -> ValuationParameters {
    let (start, end) = (d(2022, 4, 1), d(2022, 7, 1));
    let storage = benchmark_storage(start, end);
    let forward = DailySeries::from_fn(start, end, |date| {
        let i = (date - start).num_days() as f64;
        20.0 + 4.0 * (2.0 * std::f64::consts::PI * i / 45.0).sin()
    });
    let model = MultiFactorParameters::for_1_factor(14.0, DailySeries::from_fn(start, end, |_| 0.7))
        .expect("benchmark model should be valid");
    let inputs = ValuationInputs {
        current_period: Some(start),
        inventory: Some(0.0),
        forward_curve: Some(forward),
        grid_calc: Some(
            FixedSpacingGrid::for_global_inventory_range(&storage, num_grid_points)
                .expect("benchmark grid should be valid"),
        ),
        basis_functions: Some(BasisFunctions::parse("1 + x0 + x0**2 + x0**3").expect("valid basis")),
        storage: Some(storage),
        ..ValuationInputs::new()
    }
    .settle_date_rule(|date| date)
    .discounter(ContinuousCompoundingDiscounter::flat(0.03).expect("valid rate"))
    .simulator(MultiFactorSpotSimulator::new(model, num_sims, Some(42)).expect("valid simulator"));
    ValuationParameters::from_inputs(inputs).expect("benchmark inputs should be complete")
}

fn bench_valuation_sims(c: &mut Criterion) {
    let mut group = c.benchmark_group("lsmc_valuation_sims");
    group.sample_size(10);

    for sims in [500, 1_000, 2_000].iter() {
        let params = benchmark_params(*sims, 50);
        group.bench_with_input(BenchmarkId::from_parameter(sims), sims, |b, _| {
            b.iter(|| {
                let npv = calculate(black_box(&params))
                    .expect("valuation should succeed")
                    .npv;
                black_box(npv)
            })
        });
    }

    group.finish();
}

fn bench_valuation_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("lsmc_valuation_grid");
    group.sample_size(10);

    for points in [25, 50, 100].iter() {
        let params = benchmark_params(1_000, *points);
        group.bench_with_input(BenchmarkId::from_parameter(points), points, |b, _| {
            b.iter(|| {
                let npv = calculate(black_box(&params))
                    .expect("valuation should succeed")
                    .npv;
                black_box(npv)
            })
        });
    }

    group.finish();
}

fn bench_kernels(c: &mut Criterion) {
    let (start, end) = (d(2022, 4, 1), d(2022, 7, 1));
    let model = MultiFactorParameters::for_1_factor(14.0, DailySeries::from_fn(start, end, |_| 0.7))
        .expect("benchmark model should be valid");
    let simulator = MultiFactorSpotSimulator::new(model, 10_000, Some(7)).expect("valid simulator");
    let forward = DailySeries::from_fn(start, end, |_| 20.0);
    let sims = simulator
        .simulate(start, end, &forward)
        .expect("simulation should succeed");
    let date = d(2022, 5, 1);
    let factors = sims.markov_factors(date).expect("factors for date");
    let spot = sims.spot_prices_for_period(date).expect("spot for date");
    let basis = BasisFunctions::parse("1 + s + x0 + x0**2 + x0**3").expect("valid basis");

    c.bench_function("design_matrix_10k", |b| {
        b.iter(|| {
            let design = basis
                .design_matrix(black_box(&factors), black_box(spot))
                .expect("design matrix");
            black_box(design)
        })
    });

    c.bench_function("bang_bang_decision_set", |b| {
        let range = InjectWithdrawRange::new(-45.5, 56.6);
        b.iter(|| {
            let decisions = bang_bang_decision_set(
                black_box(range),
                black_box(512.0),
                0.05,
                400.0,
                560.0,
                1e-10,
                2,
            )
            .expect("feasible decisions");
            black_box(decisions)
        })
    });
}

criterion_group!(benches, bench_valuation_sims, bench_valuation_grid, bench_kernels);
criterion_main!(benches);
