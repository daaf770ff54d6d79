use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::projection::CashflowYear;
use crate::types::{Money, PaybackOutcome};

/// Simple and discounted payback for one projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaybackPeriods {
    pub nominal: PaybackOutcome,
    pub discounted: PaybackOutcome,
}

/// Walk the cumulative series (seeded at `-total_capex`) to the first year
/// it turns non-negative, interpolating linearly within that year.
pub fn payback(cashflows: &[CashflowYear], total_capex: Money) -> PaybackPeriods {
    PaybackPeriods {
        nominal: crossing(
            total_capex,
            cashflows
                .iter()
                .map(|r| (r.year, r.free_cashflow, r.cumulative_cashflow)),
        ),
        discounted: crossing(
            total_capex,
            cashflows
                .iter()
                .map(|r| (r.year, r.discounted_cashflow, r.cumulative_discounted_cashflow)),
        ),
    }
}

fn crossing<I>(total_capex: Money, rows: I) -> PaybackOutcome
where
    I: Iterator<Item = (u32, Money, Money)>,
{
    let mut previous = -total_capex;
    if previous >= Decimal::ZERO {
        return PaybackOutcome::Achieved {
            years: Decimal::ZERO,
        };
    }

    for (year, flow, cumulative) in rows {
        if previous < Decimal::ZERO && cumulative >= Decimal::ZERO && flow > Decimal::ZERO {
            let fraction = (previous.abs() / flow).min(Decimal::ONE);
            return PaybackOutcome::Achieved {
                years: Decimal::from(year - 1) + fraction,
            };
        }
        previous = cumulative;
    }

    PaybackOutcome::Never
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feasibility::assumptions::FinancialAssumptions;
    use crate::feasibility::projection::project;
    use crate::types::Currency;
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal_macros::dec;

    fn assumptions() -> FinancialAssumptions {
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

    fn row(year: u32, fcf: Money, cumulative: Money) -> CashflowYear {
        CashflowYear {
            year,
            occupancy: Decimal::ONE,
            revenue: fcf,
            opex: Decimal::ZERO,
            ebitda: fcf,
            depreciation: Decimal::ZERO,
            taxable_income: fcf,
            tax: Decimal::ZERO,
            net_income: fcf,
            free_cashflow: fcf,
            discount_factor: Decimal::ONE,
            discounted_cashflow: fcf,
            cumulative_cashflow: cumulative,
            cumulative_discounted_cashflow: cumulative,
        }
    }

    #[test]
    fn test_interpolated_crossing() {
        // -1000, +400, +400, +400 => pays back 2.5 years in
        let rows = vec![
            row(1, dec!(400), dec!(-600)),
            row(2, dec!(400), dec!(-200)),
            row(3, dec!(400), dec!(200)),
        ];
        let p = payback(&rows, dec!(1000));
        assert_eq!(p.nominal, PaybackOutcome::Achieved { years: dec!(2.5) });
    }

    #[test]
    fn test_exact_crossing_on_year_boundary() {
        let rows = vec![row(1, dec!(500), dec!(-500)), row(2, dec!(500), dec!(0))];
        let p = payback(&rows, dec!(1000));
        assert_eq!(p.nominal.years(), Some(dec!(2)));
    }

    #[test]
    fn test_zero_capex_pays_back_immediately() {
        let rows = vec![row(1, dec!(100), dec!(100))];
        assert_eq!(payback(&rows, Decimal::ZERO).nominal.years(), Some(Decimal::ZERO));
        assert_eq!(payback(&[], Decimal::ZERO).discounted.years(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_never_recovers() {
        let rows = vec![row(1, dec!(100), dec!(-900)), row(2, dec!(100), dec!(-800))];
        let p = payback(&rows, dec!(1000));
        assert_eq!(p.nominal, PaybackOutcome::Never);
        assert_eq!(payback(&[], dec!(1)).nominal, PaybackOutcome::Never);
    }

    #[test]
    fn test_projected_payback_consistency() {
        let a = assumptions();
        let rows = project(&a).unwrap();
        let p = payback(&rows, a.total_capex);

        // Reference: 4.318 nominal, 5.852 discounted
        let nominal = p.nominal.years().unwrap();
        assert!((nominal - dec!(4.318)).abs() < dec!(0.001));
        let discounted = p.discounted.years().unwrap();
        assert!((discounted - dec!(5.852)).abs() < dec!(0.001));
        assert!(discounted > nominal);

        let floor = nominal.floor().to_usize().unwrap();
        let ceil = nominal.ceil().to_usize().unwrap();
        let cumulative_at = |y: usize| {
            if y == 0 {
                -a.total_capex
            } else {
                rows[y - 1].cumulative_cashflow
            }
        };
        assert!(cumulative_at(floor) <= Decimal::ZERO);
        assert!(cumulative_at(ceil) >= Decimal::ZERO);
    }
}
