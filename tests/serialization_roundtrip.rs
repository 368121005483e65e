use std::fmt::Debug;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use ferric_storage::core::{CashFlow, DailySeries, InventoryRange};
use ferric_storage::lsmc::{
    BasisFunctions, PowerMonomial, ValuationConfig, ValuationInputs, ValuationParameters,
    ValuationResults, calculate,
};
use ferric_storage::models::{MultiFactorParameters, MultiFactorSpotSimulator};
use ferric_storage::rates::ContinuousCompoundingDiscounter;
use ferric_storage::storage::{
    CmdtyStorage, FixedSpacingGrid, InjectWithdrawConstraint, RatchetInterpolation,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

fn assert_roundtrip<T>(value: &T)
where
    T: Serialize + DeserializeOwned + PartialEq + Debug,
{
    let json = serde_json::to_vec_pretty(value).expect("json serialize");
    let from_json: T = serde_json::from_slice(&json).expect("json deserialize");
    assert_eq!(from_json, *value, "json roundtrip mismatch");
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn model_types_roundtrip() {
    assert_roundtrip(&CashFlow::new(d(2020, 1, 20), 125.5));
    assert_roundtrip(&InventoryRange::new(0.0, 2500.0));
    assert_roundtrip(&DailySeries::new(d(2020, 1, 1), vec![1.5, 2.25, 3.0]));
    assert_roundtrip(&FixedSpacingGrid::new(100.0, 0.0).unwrap());
    assert_roundtrip(&RatchetInterpolation::PiecewiseLinear);
    assert_roundtrip(
        &InjectWithdrawConstraint::piecewise_flat([(0.0, (-45.5, 56.75)), (1000.0, (-47.0, 50.5))])
            .unwrap(),
    );
    assert_roundtrip(&PowerMonomial::new(2, &[(0, 1), (3, 4)]).unwrap());
    assert_roundtrip(&ValuationConfig {
        num_extra_decisions: 2,
        basis_functions: Some("1 + s + x0**2".to_string()),
        ..ValuationConfig::default()
    });
}

#[test]
fn valuation_results_roundtrip() {
    let (start, end) = (d(2020, 6, 1), d(2020, 6, 15));
    let storage = CmdtyStorage::builder()
        .active_period(start, end)
        .constant_inject_withdraw_range(-5.0, 5.0)
        .min_inventory(0.0)
        .max_inventory(40.0)
        .per_unit_injection_cost(0.02, |date| date)
        .no_cmdty_consumed_on_inject()
        .per_unit_withdrawal_cost(0.02, |date| date)
        .no_cmdty_consumed_on_withdraw()
        .no_cmdty_inventory_loss()
        .no_inventory_cost()
        .must_be_empty_at_end()
        .build()
        .unwrap();
    let model =
        MultiFactorParameters::for_1_factor(8.0, DailySeries::from_fn(start, end, |_| 0.5)).unwrap();
    let inputs = ValuationInputs {
        current_period: Some(start),
        inventory: Some(0.0),
        forward_curve: Some(DailySeries::from_fn(start, end, |_| 3.0)),
        grid_calc: Some(FixedSpacingGrid::new(5.0, 0.0).unwrap()),
        basis_functions: Some(BasisFunctions::parse("1 + x0 + x0**2").unwrap()),
        storage: Some(storage),
        ..ValuationInputs::new()
    }
    .settle_date_rule(|date| date)
    .discounter(ContinuousCompoundingDiscounter::flat(0.01).unwrap())
    .simulator(MultiFactorSpotSimulator::new(model, 16, Some(5)).unwrap());
    let results = calculate(&ValuationParameters::from_inputs(inputs).unwrap()).unwrap();

    let json = serde_json::to_string(&results).unwrap();
    let back: ValuationResults = serde_json::from_str(&json).unwrap();
    assert_relative_eq!(back.npv, results.npv, max_relative = 1e-14);
    assert_eq!(back.deltas.len(), results.deltas.len());
    assert_eq!(back.deltas.start(), results.deltas.start());
    assert_eq!(back.inventory_by_sim.num_periods(), results.inventory_by_sim.num_periods());
    assert_eq!(back.inventory_by_sim.num_sims(), 16);
    assert_eq!(back.trigger_prices.len(), results.trigger_prices.len());
    for (a, b) in back.spot_price_by_sim.rows().iter().zip(results.spot_price_by_sim.rows()) {
        for (x, y) in a.iter().zip(b) {
            assert_relative_eq!(*x, *y, max_relative = 1e-14);
        }
    }
}
