use dc_feasibility_core::feasibility::assumptions::{Driver, FinancialAssumptions};
use dc_feasibility_core::feasibility::model::evaluate_returns;
use dc_feasibility_core::scenarios::sensitivity::{
    analyze, npv_grid, tornado_analysis, GridAxis, NpvGridInput, TornadoInput, TornadoVariable,
};
use dc_feasibility_core::Currency;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn colo_baseline() -> FinancialAssumptions {
    FinancialAssumptions {
        total_capex: dec!(10_000_000),
        annual_opex_base: dec!(2_000_000),
        revenue_per_kw_month: dec!(150),
        it_load_kw: dec!(2500),
        discount_rate: dec!(0.10),
        project_life_years: 10,
        escalation_rate: dec!(0.03),
        opex_escalation: dec!(0.035),
        occupancy_ramp: Some(vec![Decimal::ONE]),
        tax_rate: dec!(0.25),
        depreciation_years: 7,
        currency: Currency::USD,
    }
}

fn usual_drivers() -> Vec<TornadoVariable> {
    vec![
        Driver::TotalCapex.into(),
        Driver::AnnualOpexBase.into(),
        Driver::RevenuePerKwMonth.into(),
        Driver::DiscountRate.into(),
        Driver::TaxRate.into(),
    ]
}

#[test]
fn test_revenue_rate_ranks_first() {
    let results = analyze(&colo_baseline(), &usual_drivers(), dec!(0.20)).unwrap();
    assert_eq!(results[0].variable_name, "revenue_per_kw_month");
    for pair in results.windows(2) {
        assert!(pair[0].range.unwrap() >= pair[1].range.unwrap());
    }
}

#[test]
fn test_revenue_swing_signs() {
    let results = analyze(&colo_baseline(), &[Driver::RevenuePerKwMonth.into()], dec!(0.20)).unwrap();
    let r = &results[0];
    assert_eq!(r.low_value, dec!(120));
    assert_eq!(r.high_value, dec!(180));
    assert!(r.low_delta.unwrap() < Decimal::ZERO);
    assert!(r.high_delta.unwrap() > Decimal::ZERO);
    assert!((r.range.unwrap() - dec!(9_285_000)).abs() < dec!(25_000));
}

#[test]
fn test_ties_keep_input_order() {
    // Price and load enter revenue as a product: identical swings
    let vars: Vec<TornadoVariable> = vec![Driver::ItLoadKw.into(), Driver::RevenuePerKwMonth.into()];
    let results = analyze(&colo_baseline(), &vars, dec!(0.20)).unwrap();
    assert_eq!(results[0].range, results[1].range);
    assert_eq!(results[0].variable_name, "it_load_kw");
}

#[test]
fn test_runs_do_not_leak_into_base() {
    let base = colo_baseline();
    let before = evaluate_returns(&base).unwrap();
    analyze(&base, &usual_drivers(), dec!(0.20)).unwrap();
    assert_eq!(base, colo_baseline());
    assert_eq!(evaluate_returns(&base).unwrap(), before);
}

#[test]
fn test_occupancy_scale_driver() {
    let results = analyze(&colo_baseline(), &[Driver::OccupancyScale.into()], dec!(0.10)).unwrap();
    let r = &results[0];
    assert_eq!(r.base_value, Decimal::ONE);
    assert!(r.npv_at_low.unwrap() < r.npv_at_high.unwrap());
}

#[test]
fn test_tornado_envelope() {
    let input = TornadoInput {
        base: colo_baseline(),
        variables: usual_drivers(),
        perturbation: dec!(0.20),
    };
    let out = tornado_analysis(&input).unwrap();
    assert_eq!(out.result.results.len(), 5);
    assert!((out.result.base_npv - dec!(4_444_745.65)).abs() < dec!(1));
    assert!(out.result.base_irr.is_defined());
    assert_eq!(out.result.currency, Currency::USD);
    // Deltas are measured against the reported base
    for r in &out.result.results {
        assert_eq!(r.npv_at_high.unwrap() - out.result.base_npv, r.high_delta.unwrap());
        assert_eq!(r.npv_at_low.unwrap() - out.result.base_npv, r.low_delta.unwrap());
    }
}

#[test]
fn test_high_tax_base_still_ranks_other_drivers() {
    // +20% on a 0.85 tax rate leaves the [0, 1) domain
    let mut base = colo_baseline();
    base.tax_rate = dec!(0.85);
    let vars: Vec<TornadoVariable> = vec![Driver::TaxRate.into(), Driver::RevenuePerKwMonth.into()];
    let results = analyze(&base, &vars, dec!(0.20)).unwrap();

    assert_eq!(results[0].variable_name, "revenue_per_kw_month");
    assert!(results[0].is_complete());

    let tax = &results[1];
    assert_eq!(tax.variable_name, "tax_rate");
    assert_eq!(tax.high_value, dec!(1.02));
    assert!(tax.npv_at_low.is_some());
    assert_eq!(tax.npv_at_high, None);
    assert_eq!(tax.range, None);
    assert_eq!(tax.failures.len(), 1);
}

#[test]
fn test_tornado_warns_on_unevaluated_end() {
    let mut base = colo_baseline();
    base.tax_rate = dec!(0.85);
    let input = TornadoInput {
        base,
        variables: vec![Driver::TaxRate.into(), Driver::TotalCapex.into()],
        perturbation: dec!(0.20),
    };
    let out = tornado_analysis(&input).unwrap();
    assert_eq!(out.result.results.len(), 2);
    assert_eq!(out.result.results[0].variable_name, "total_capex");
    assert!(out.warnings.iter().any(|w| w.starts_with("tax_rate could not be evaluated")));
}

#[test]
fn test_tornado_input_from_json_defaults_perturbation() {
    let json = serde_json::json!({
        "base": colo_baseline(),
        "variables": [{ "driver": "total_capex" }, { "driver": "tax_rate", "perturbation": "0.1" }]
    });
    let input: TornadoInput = serde_json::from_value(json).unwrap();
    assert_eq!(input.perturbation, dec!(0.20));
    assert_eq!(input.variables[1].perturbation, Some(dec!(0.1)));
}

#[test]
fn test_grid_over_capex_and_occupancy() {
    let input = NpvGridInput {
        base: colo_baseline(),
        axis_1: GridAxis {
            driver: Driver::TotalCapex,
            min: dec!(8_000_000),
            max: dec!(12_000_000),
            step: dec!(2_000_000),
        },
        axis_2: GridAxis {
            driver: Driver::OccupancyScale,
            min: dec!(0.8),
            max: dec!(1.0),
            step: dec!(0.1),
        },
    };
    let out = npv_grid(&input).unwrap().result;
    assert_eq!(out.axis_1_values.len(), 3);
    assert_eq!(out.axis_2_values.len(), 3);
    assert_eq!(out.base_case_position, (1, 2));
    // Cheapest build at full occupancy is the best cell
    let best = out.matrix[0][2].unwrap();
    assert!(out.matrix.iter().flatten().all(|c| c.unwrap() <= best));
}
