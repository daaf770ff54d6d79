use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::projection::CashflowYear;
use crate::error::FeasibilityError;
use crate::time_value;
use crate::types::{IrrOutcome, IrrUndefinedReason, Money, Rate};
use crate::FeasibilityResult;

/// NPV of the projected free cash flows at an arbitrary `rate`, net of the
/// year-0 capital outlay.
///
/// Recomputes the discounting from `free_cashflow` and `year` rather than
/// reusing each row's `discounted_cashflow`, which is fixed at the
/// assumptions' own discount rate.
pub fn npv(cashflows: &[CashflowYear], rate: Rate, total_capex: Money) -> FeasibilityResult<Money> {
    let mut result = -total_capex;
    for row in cashflows {
        let df = time_value::discount_factor(rate, row.year)?;
        let pv = row
            .free_cashflow
            .checked_mul(df)
            .ok_or_else(|| FeasibilityError::overflow(format!("NPV term at year {}", row.year)))?;
        result = result
            .checked_add(pv)
            .ok_or_else(|| FeasibilityError::overflow("NPV sum"))?;
    }
    Ok(result)
}

/// IRR of the projection: the rate at which [`npv`] is zero.
pub fn irr(cashflows: &[CashflowYear], total_capex: Money) -> IrrOutcome {
    if total_capex.is_zero() {
        return IrrOutcome::Undefined {
            reason: IrrUndefinedReason::ZeroInvestment,
        };
    }
    if cashflows.is_empty() {
        return IrrOutcome::Undefined {
            reason: IrrUndefinedReason::NoCashflows,
        };
    }
    time_value::irr(&cash_flow_series(cashflows, total_capex))
}

/// Period-indexed series: `[-capex, fcf_1, ..., fcf_n]`.
pub fn cash_flow_series(cashflows: &[CashflowYear], total_capex: Money) -> Vec<Money> {
    let last_year = cashflows.iter().map(|r| r.year).max().unwrap_or(0) as usize;
    let mut series = vec![Decimal::ZERO; last_year + 1];
    series[0] = -total_capex;
    for row in cashflows {
        series[row.year as usize] += row.free_cashflow;
    }
    series
}

/// Sum of revenue across the projection.
pub fn total_revenue(cashflows: &[CashflowYear]) -> FeasibilityResult<Money> {
    checked_sum(cashflows.iter().map(|r| r.revenue), "total revenue")
}

/// Sum of net income across the projection.
pub fn total_profit(cashflows: &[CashflowYear]) -> FeasibilityResult<Money> {
    checked_sum(cashflows.iter().map(|r| r.net_income), "total profit")
}

/// ROI in percent: total profit / capex * 100. `None` without capex.
pub fn roi_pct(total_profit: Money, total_capex: Money) -> FeasibilityResult<Option<Decimal>> {
    if total_capex.is_zero() {
        return Ok(None);
    }
    total_profit
        .checked_div(total_capex)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .map(Some)
        .ok_or_else(|| FeasibilityError::overflow("ROI"))
}

/// PV of projected cash flows divided by capex. `None` without capex.
pub fn profitability_index(cashflows: &[CashflowYear], total_capex: Money) -> FeasibilityResult<Option<Decimal>> {
    if total_capex.is_zero() {
        return Ok(None);
    }
    let pv = checked_sum(cashflows.iter().map(|r| r.discounted_cashflow), "PV of cash flows")?;
    pv.checked_div(total_capex)
        .map(Some)
        .ok_or_else(|| FeasibilityError::overflow("profitability index"))
}

fn checked_sum(mut values: impl Iterator<Item = Money>, context: &str) -> FeasibilityResult<Money> {
    values.try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or_else(|| FeasibilityError::overflow(context))
    })
}
