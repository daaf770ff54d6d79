use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::assumptions::FinancialAssumptions;
use super::break_even::{break_even_occupancy, BreakEvenOccupancy, BreakEvenStatus};
use super::occupancy::{resolve_ramp, RampSource};
use super::payback::payback;
use super::projection::{project, CashflowYear};
use super::returns;
use crate::types::{
    with_metadata, ComputationOutput, Currency, IrrOutcome, IrrUndefinedReason, Money, PaybackOutcome,
};
use crate::FeasibilityResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Complete feasibility result for one assumption set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialResult {
    /// Currency of every monetary field
    pub currency: Currency,
    /// Year-by-year pro forma
    pub cashflows: Vec<CashflowYear>,
    /// NPV at the assumptions' discount rate, net of capex
    pub npv: Money,
    /// Project IRR (decimal rate) or why it is undefined
    pub irr: IrrOutcome,
    pub payback_period_years: PaybackOutcome,
    pub discounted_payback_years: PaybackOutcome,
    /// Total profit / capex * 100; absent when capex is zero
    pub roi_pct: Option<Decimal>,
    /// PV of projected cash flows / capex; absent when capex is zero
    pub profitability_index: Option<Decimal>,
    pub break_even_occupancy: BreakEvenOccupancy,
    pub total_revenue: Money,
    /// Sum of net income over the project life
    pub total_profit: Money,
}

/// The headline returns recomputed on every sensitivity run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnsSummary {
    pub npv: Money,
    pub irr: IrrOutcome,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Projection, NPV and IRR only.
pub fn evaluate_returns(assumptions: &FinancialAssumptions) -> FeasibilityResult<ReturnsSummary> {
    let cashflows = project(assumptions)?;
    Ok(ReturnsSummary {
        npv: returns::npv(&cashflows, assumptions.discount_rate, assumptions.total_capex)?,
        irr: returns::irr(&cashflows, assumptions.total_capex),
    })
}

/// Every metric of [`FinancialResult`] for one assumption set.
pub fn evaluate(assumptions: &FinancialAssumptions) -> FeasibilityResult<FinancialResult> {
    let cashflows = project(assumptions)?;
    let capex = assumptions.total_capex;

    let npv = returns::npv(&cashflows, assumptions.discount_rate, capex)?;
    let irr = returns::irr(&cashflows, capex);
    let paybacks = payback(&cashflows, capex);
    let total_revenue = returns::total_revenue(&cashflows)?;
    let total_profit = returns::total_profit(&cashflows)?;
    let roi_pct = returns::roi_pct(total_profit, capex)?;
    let profitability_index = returns::profitability_index(&cashflows, capex)?;
    let break_even = break_even_occupancy(assumptions)?;

    Ok(FinancialResult {
        currency: assumptions.currency.clone(),
        cashflows,
        npv,
        irr,
        payback_period_years: paybacks.nominal,
        discounted_payback_years: paybacks.discounted,
        roi_pct,
        profitability_index,
        break_even_occupancy: break_even,
        total_revenue,
        total_profit,
    })
}

/// Run the full feasibility model and wrap it with methodology, warnings
/// and timing metadata.
pub fn model_feasibility(
    assumptions: &FinancialAssumptions,
) -> FeasibilityResult<ComputationOutput<FinancialResult>> {
    let start = Instant::now();
    let result = evaluate(assumptions)?;
    let warnings = collect_warnings(assumptions, &result);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Data-Center Feasibility Pro Forma (NPV / IRR / Payback / Break-even)",
        &serde_json::json!({
            "total_capex": assumptions.total_capex.to_string(),
            "annual_opex_base": assumptions.annual_opex_base.to_string(),
            "revenue_per_kw_month": assumptions.revenue_per_kw_month.to_string(),
            "it_load_kw": assumptions.it_load_kw.to_string(),
            "discount_rate": assumptions.discount_rate.to_string(),
            "project_life_years": assumptions.project_life_years,
            "tax_rate": assumptions.tax_rate.to_string(),
            "depreciation_years": assumptions.depreciation_years,
            "currency": assumptions.currency,
        }),
        warnings,
        elapsed,
        result,
    ))
}

fn collect_warnings(assumptions: &FinancialAssumptions, result: &FinancialResult) -> Vec<String> {
    let mut warnings = Vec::new();
    let life = assumptions.project_life_years;

    match resolve_ramp(assumptions.occupancy_ramp.as_deref(), life).source {
        RampSource::Default if life > 0 => warnings.push(
            "No occupancy ramp supplied; default 30% to 100% ramp over 4 years applied".into(),
        ),
        RampSource::Padded { supplied_years } => warnings.push(format!(
            "Occupancy ramp has {supplied_years} years for a {life}-year project; last value repeated"
        )),
        RampSource::Truncated { supplied_years } => warnings.push(format!(
            "Occupancy ramp has {supplied_years} years for a {life}-year project; extra years ignored"
        )),
        _ => {}
    }

    if assumptions.depreciation_years > life && assumptions.total_capex > Decimal::ZERO {
        let depreciated: Money = result.cashflows.iter().map(|r| r.depreciation).sum();
        warnings.push(format!(
            "Depreciation period ({} years) exceeds project life ({life} years); {} of capex remains undepreciated",
            assumptions.depreciation_years,
            (assumptions.total_capex - depreciated).round_dp(2)
        ));
    }

    if let IrrOutcome::Undefined { reason } = result.irr {
        let detail = match reason {
            IrrUndefinedReason::ZeroInvestment => "no capital is invested",
            IrrUndefinedReason::NoCashflows => "the project has no operating years",
            IrrUndefinedReason::NoSignChange => "NPV does not cross zero between -99% and +1000%",
        };
        warnings.push(format!("IRR is undefined: {detail}"));
    }

    if result.payback_period_years == PaybackOutcome::Never {
        warnings.push("Capital is not recovered within the project life".into());
    } else if result.discounted_payback_years == PaybackOutcome::Never {
        warnings.push("Capital is not recovered on a discounted basis within the project life".into());
    }

    let be = result.break_even_occupancy;
    match be.status {
        BreakEvenStatus::Feasible => {}
        BreakEvenStatus::AboveFullOccupancy => warnings.push(format!(
            "Break-even occupancy of {}% exceeds 100%: infeasible under current assumptions",
            be.occupancy_pct.round_dp(2)
        )),
        BreakEvenStatus::Unreachable => warnings.push(
            "NPV stays negative even at 200% occupancy: infeasible under current assumptions".into(),
        ),
        BreakEvenStatus::ProfitableAtZero => {
            warnings.push("NPV is non-negative at 0% occupancy; break-even reported as 0%".into())
        }
    }

    if result.npv < Decimal::ZERO {
        warnings.push(format!(
            "NPV is negative at a {} discount rate",
            assumptions.discount_rate.round_dp(4)
        ));
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
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
            occupancy_ramp: Some(vec![Decimal::ONE; 10]),
            tax_rate: dec!(0.25),
            depreciation_years: 7,
            currency: Currency::USD,
        }
    }

    #[test]
    fn test_profitable_baseline_has_no_warnings() {
        let out = model_feasibility(&colo_baseline()).unwrap();
        assert!(out.warnings.is_empty(), "unexpected warnings: {:?}", out.warnings);
        assert!(out.result.npv > Decimal::ZERO);
        assert_eq!(out.result.cashflows.len(), 10);
        assert!(out.result.break_even_occupancy.is_feasible());
    }

    #[test]
    fn test_evaluate_returns_matches_full_model() {
        let a = colo_baseline();
        let quick = evaluate_returns(&a).unwrap();
        let full = evaluate(&a).unwrap();
        assert_eq!(quick.npv, full.npv);
        assert_eq!(quick.irr, full.irr);
    }

    #[test]
    fn test_default_ramp_warning() {
        let mut a = colo_baseline();
        a.occupancy_ramp = None;
        let out = model_feasibility(&a).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("default 30% to 100% ramp")));
    }

    #[test]
    fn test_short_life_depreciation_warning() {
        let mut a = colo_baseline();
        a.project_life_years = 5;
        a.occupancy_ramp = Some(vec![Decimal::ONE]);
        let out = model_feasibility(&a).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("undepreciated")));
    }

    #[test]
    fn test_cost_center_warnings() {
        let mut a = colo_baseline();
        a.revenue_per_kw_month = Decimal::ZERO;
        let out = model_feasibility(&a).unwrap();
        assert!(out.warnings.iter().any(|w| w.starts_with("IRR is undefined")));
        assert!(out.warnings.iter().any(|w| w.contains("not recovered")));
        assert!(out.warnings.iter().any(|w| w.contains("200% occupancy")));
        assert_eq!(out.result.payback_period_years, PaybackOutcome::Never);
    }

    #[test]
    fn test_zero_life_degenerate_result() {
        let mut a = colo_baseline();
        a.project_life_years = 0;
        let r = evaluate(&a).unwrap();
        assert!(r.cashflows.is_empty());
        assert_eq!(r.npv, dec!(-10_000_000));
        assert_eq!(
            r.irr,
            IrrOutcome::Undefined {
                reason: IrrUndefinedReason::NoCashflows
            }
        );
        assert_eq!(r.total_revenue, Decimal::ZERO);
    }
}
