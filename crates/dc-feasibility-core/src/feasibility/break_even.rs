use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::assumptions::FinancialAssumptions;
use super::projection::project_with_occupancy;
use super::returns;
use crate::types::Money;
use crate::FeasibilityResult;

/// Upper end of the occupancy search, as a fraction (200%).
pub const MAX_SEARCH_OCCUPANCY: Decimal = dec!(2);

const MAX_BISECTION_ITERATIONS: u32 = 100;
const OCCUPANCY_TOLERANCE: Decimal = dec!(0.0000000001);

/// How the break-even occupancy relates to what a facility can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakEvenStatus {
    /// Between 0% and 100%.
    Feasible,
    /// Above 100% but inside the 200% search range: infeasible as modelled.
    AboveFullOccupancy,
    /// NPV is negative even at 200%; reported as 200%.
    Unreachable,
    /// NPV is already non-negative at 0%; reported as 0%.
    ProfitableAtZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEvenOccupancy {
    /// Flat occupancy, in percent, at which NPV crosses zero
    pub occupancy_pct: Decimal,
    pub status: BreakEvenStatus,
}

impl BreakEvenOccupancy {
    pub fn is_feasible(&self) -> bool {
        self.status == BreakEvenStatus::Feasible
    }
}

/// NPV with the same occupancy applied to every year, ignoring the ramp.
pub fn npv_at_flat_occupancy(
    assumptions: &FinancialAssumptions,
    occupancy: Decimal,
) -> FeasibilityResult<Money> {
    let flat = vec![occupancy; assumptions.project_life_years as usize];
    let rows = project_with_occupancy(assumptions, &flat)?;
    returns::npv(&rows, assumptions.discount_rate, assumptions.total_capex)
}

/// Flat occupancy at which NPV is zero, by bisection over [0%, 200%].
///
/// NPV is non-decreasing in occupancy (OpEx does not depend on it), so the
/// bracket only needs checking once at its ends.
pub fn break_even_occupancy(assumptions: &FinancialAssumptions) -> FeasibilityResult<BreakEvenOccupancy> {
    assumptions.validate()?;

    let mut lo = Decimal::ZERO;
    let mut hi = MAX_SEARCH_OCCUPANCY;

    if npv_at_flat_occupancy(assumptions, lo)? >= Decimal::ZERO {
        return Ok(BreakEvenOccupancy {
            occupancy_pct: Decimal::ZERO,
            status: BreakEvenStatus::ProfitableAtZero,
        });
    }
    if npv_at_flat_occupancy(assumptions, hi)? < Decimal::ZERO {
        debug!("break-even: NPV negative at maximum search occupancy");
        return Ok(BreakEvenOccupancy {
            occupancy_pct: MAX_SEARCH_OCCUPANCY * dec!(100),
            status: BreakEvenStatus::Unreachable,
        });
    }

    let mut iterations = 0;
    while hi - lo > OCCUPANCY_TOLERANCE && iterations < MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        if npv_at_flat_occupancy(assumptions, mid)? < Decimal::ZERO {
            lo = mid;
        } else {
            hi = mid;
        }
        iterations += 1;
    }
    trace!(iterations, "break-even: bisection finished");

    let occupancy_pct = ((lo + hi) / dec!(2) * dec!(100)).round_dp(8);
    let status = if occupancy_pct <= dec!(100) {
        BreakEvenStatus::Feasible
    } else {
        BreakEvenStatus::AboveFullOccupancy
    };

    Ok(BreakEvenOccupancy {
        occupancy_pct,
        status,
    })
}
