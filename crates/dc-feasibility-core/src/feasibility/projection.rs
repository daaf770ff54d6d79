use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::assumptions::FinancialAssumptions;
use super::occupancy::resolve_ramp;
use crate::error::FeasibilityError;
use crate::types::{Money, Rate};
use crate::FeasibilityResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One year of the pro forma. Year 0 (the capital outlay) is implicit:
/// both cumulative series start from `-total_capex`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowYear {
    /// Operating year, 1-based
    pub year: u32,
    /// Occupancy applied to full-load revenue this year
    pub occupancy: Rate,
    pub revenue: Money,
    pub opex: Money,
    /// EBITDA = revenue - opex
    pub ebitda: Money,
    /// Straight-line depreciation charge
    pub depreciation: Money,
    /// max(0, EBITDA - depreciation); losses are not carried forward
    pub taxable_income: Money,
    pub tax: Money,
    /// EBITDA - depreciation - tax
    pub net_income: Money,
    /// Net income with depreciation added back
    pub free_cashflow: Money,
    /// 1 / (1 + discount_rate)^year
    pub discount_factor: Decimal,
    pub discounted_cashflow: Money,
    pub cumulative_cashflow: Money,
    pub cumulative_discounted_cashflow: Money,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Build the year-by-year cash-flow projection.
///
/// Occupancy comes from the assumptions' ramp (padded, truncated or
/// defaulted to the project life) and is clamped to [0, 1].
pub fn project(assumptions: &FinancialAssumptions) -> FeasibilityResult<Vec<CashflowYear>> {
    assumptions.validate()?;
    let ramp = resolve_ramp(
        assumptions.occupancy_ramp.as_deref(),
        assumptions.project_life_years,
    );
    let occupancy: Vec<Rate> = ramp
        .values
        .into_iter()
        .map(|occ| occ.clamp(Decimal::ZERO, Decimal::ONE))
        .collect();
    project_with_occupancy(assumptions, &occupancy)
}

/// Projection with an explicit, unclamped occupancy per year. Used by the
/// break-even solver, which probes flat occupancies above 100%.
pub(crate) fn project_with_occupancy(
    assumptions: &FinancialAssumptions,
    occupancy: &[Rate],
) -> FeasibilityResult<Vec<CashflowYear>> {
    let life = assumptions.project_life_years;
    let full_revenue = assumptions.full_occupancy_revenue()?;
    let tax_rate = assumptions.tax_rate;

    let annual_depreciation = assumptions.total_capex / Decimal::from(assumptions.depreciation_years);
    let mut remaining_depreciable = assumptions.total_capex;

    let revenue_growth = Decimal::ONE + assumptions.escalation_rate;
    let opex_growth = Decimal::ONE + assumptions.opex_escalation;
    let one_plus_r = Decimal::ONE + assumptions.discount_rate;

    let mut revenue_factor = Decimal::ONE;
    let mut opex_factor = Decimal::ONE;
    let mut compounded = Decimal::ONE;

    let mut cumulative = -assumptions.total_capex;
    let mut cumulative_discounted = -assumptions.total_capex;

    let mut rows = Vec::with_capacity(life as usize);

    for year in 1..=life {
        if year > 1 {
            revenue_factor = checked(revenue_factor.checked_mul(revenue_growth), year, "revenue escalation")?;
            opex_factor = checked(opex_factor.checked_mul(opex_growth), year, "opex escalation")?;
        }
        compounded = checked(compounded.checked_mul(one_plus_r), year, "discount compounding")?;

        let occ = occupancy
            .get(year as usize - 1)
            .or(occupancy.last())
            .copied()
            .unwrap_or(Decimal::ZERO);

        let revenue = checked(
            full_revenue
                .checked_mul(occ)
                .and_then(|r| r.checked_mul(revenue_factor)),
            year,
            "revenue",
        )?;
        let opex = checked(assumptions.annual_opex_base.checked_mul(opex_factor), year, "opex")?;
        let ebitda = revenue - opex;

        // Depreciation runs for min(depreciation_years, project_life_years)
        let depreciation = if year <= assumptions.depreciation_years {
            annual_depreciation.min(remaining_depreciable)
        } else {
            Decimal::ZERO
        };
        remaining_depreciable = (remaining_depreciable - depreciation).max(Decimal::ZERO);

        let pre_tax = checked(ebitda.checked_sub(depreciation), year, "pre-tax income")?;
        let taxable_income = pre_tax.max(Decimal::ZERO);
        let tax = taxable_income * tax_rate;
        let net_income = pre_tax - tax;
        let free_cashflow = net_income + depreciation;

        let discount_factor = checked(Decimal::ONE.checked_div(compounded), year, "discount factor")?;
        let discounted_cashflow = checked(free_cashflow.checked_mul(discount_factor), year, "discounted cash flow")?;

        cumulative = checked(cumulative.checked_add(free_cashflow), year, "cumulative cash flow")?;
        cumulative_discounted = checked(
            cumulative_discounted.checked_add(discounted_cashflow),
            year,
            "cumulative discounted cash flow",
        )?;

        rows.push(CashflowYear {
            year,
            occupancy: occ,
            revenue,
            opex,
            ebitda,
            depreciation,
            taxable_income,
            tax,
            net_income,
            free_cashflow,
            discount_factor,
            discounted_cashflow,
            cumulative_cashflow: cumulative,
            cumulative_discounted_cashflow: cumulative_discounted,
        });
    }

    Ok(rows)
}

fn checked(value: Option<Decimal>, year: u32, what: &str) -> FeasibilityResult<Decimal> {
    value.ok_or_else(|| FeasibilityError::overflow(format!("{what} at year {year}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
