use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::occupancy::resolve_ramp;
use crate::error::FeasibilityError;
use crate::types::{Currency, Money, Rate};
use crate::FeasibilityResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Scalar assumptions for a data-center feasibility case.
///
/// Treated as an immutable value: analyzers derive variants through
/// [`FinancialAssumptions::with_driver`] instead of mutating a shared copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialAssumptions {
    /// Upfront investment, spent at year 0
    pub total_capex: Money,
    /// Year-1 operating expenditure before escalation
    pub annual_opex_base: Money,
    /// Contracted price per kW of IT load per month
    pub revenue_per_kw_month: Money,
    /// Sellable IT load in kW at full occupancy
    pub it_load_kw: Decimal,
    /// Discount rate for NPV (decimal, e.g. 0.10 = 10%)
    pub discount_rate: Rate,
    /// Number of operating years modelled
    pub project_life_years: u32,
    /// Annual revenue escalation applied from year 2
    #[serde(default)]
    pub escalation_rate: Rate,
    /// Annual OpEx escalation applied from year 2
    #[serde(default)]
    pub opex_escalation: Rate,
    /// Occupancy fraction per year (0..1). Padded with its last value or
    /// truncated to the project life; a default ramp is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy_ramp: Option<Vec<Rate>>,
    /// Corporate tax rate
    #[serde(default)]
    pub tax_rate: Rate,
    /// Straight-line depreciation period in years
    #[serde(default = "default_depreciation_years")]
    pub depreciation_years: u32,
    /// Reporting currency
    #[serde(default)]
    pub currency: Currency,
}

fn default_depreciation_years() -> u32 {
    15
}

/// An input that sensitivity, scenario and simulation runs can vary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    TotalCapex,
    AnnualOpexBase,
    RevenuePerKwMonth,
    ItLoadKw,
    DiscountRate,
    EscalationRate,
    OpexEscalation,
    TaxRate,
    /// Multiplier applied to every year of the occupancy ramp (base 1.0).
    OccupancyScale,
    /// A named slice of `annual_opex_base` supplied by an upstream model,
    /// e.g. staffing headcount cost or a per-role salary line. Changing it
    /// shifts the OpEx base by the difference from `annual_amount`.
    OpexComponent { name: String, annual_amount: Money },
}

impl Driver {
    pub fn label(&self) -> String {
        match self {
            Driver::TotalCapex => "total_capex".into(),
            Driver::AnnualOpexBase => "annual_opex_base".into(),
            Driver::RevenuePerKwMonth => "revenue_per_kw_month".into(),
            Driver::ItLoadKw => "it_load_kw".into(),
            Driver::DiscountRate => "discount_rate".into(),
            Driver::EscalationRate => "escalation_rate".into(),
            Driver::OpexEscalation => "opex_escalation".into(),
            Driver::TaxRate => "tax_rate".into(),
            Driver::OccupancyScale => "occupancy_scale".into(),
            Driver::OpexComponent { name, .. } => format!("opex:{name}"),
        }
    }

    /// Current value of this driver in `assumptions`.
    pub fn base_value(&self, assumptions: &FinancialAssumptions) -> Decimal {
        match self {
            Driver::TotalCapex => assumptions.total_capex,
            Driver::AnnualOpexBase => assumptions.annual_opex_base,
            Driver::RevenuePerKwMonth => assumptions.revenue_per_kw_month,
            Driver::ItLoadKw => assumptions.it_load_kw,
            Driver::DiscountRate => assumptions.discount_rate,
            Driver::EscalationRate => assumptions.escalation_rate,
            Driver::OpexEscalation => assumptions.opex_escalation,
            Driver::TaxRate => assumptions.tax_rate,
            Driver::OccupancyScale => Decimal::ONE,
            Driver::OpexComponent { annual_amount, .. } => *annual_amount,
        }
    }
}

impl FinancialAssumptions {
    /// Annual revenue at 100% occupancy before escalation.
    pub fn full_occupancy_revenue(&self) -> FeasibilityResult<Money> {
        self.revenue_per_kw_month
            .checked_mul(dec!(12))
            .and_then(|r| r.checked_mul(self.it_load_kw))
            .ok_or_else(|| FeasibilityError::overflow("full-occupancy revenue"))
    }

    /// A copy of these assumptions with one driver replaced by `value`.
    /// `self` is never modified.
    pub fn with_driver(&self, driver: &Driver, value: Decimal) -> FeasibilityResult<FinancialAssumptions> {
        let mut next = self.clone();
        match driver {
            Driver::TotalCapex => next.total_capex = value,
            Driver::AnnualOpexBase => next.annual_opex_base = value,
            Driver::RevenuePerKwMonth => next.revenue_per_kw_month = value,
            Driver::ItLoadKw => next.it_load_kw = value,
            Driver::DiscountRate => next.discount_rate = value,
            Driver::EscalationRate => next.escalation_rate = value,
            Driver::OpexEscalation => next.opex_escalation = value,
            Driver::TaxRate => next.tax_rate = value,
            Driver::OccupancyScale => {
                let ramp = resolve_ramp(self.occupancy_ramp.as_deref(), self.project_life_years);
                let scaled = ramp
                    .values
                    .iter()
                    .map(|occ| occ.checked_mul(value))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| FeasibilityError::overflow("scaled occupancy ramp"))?;
                next.occupancy_ramp = Some(scaled);
            }
            Driver::OpexComponent { annual_amount, .. } => {
                next.annual_opex_base = value
                    .checked_sub(*annual_amount)
                    .and_then(|shift| self.annual_opex_base.checked_add(shift))
                    .ok_or_else(|| FeasibilityError::overflow(driver.label()))?;
            }
        }
        Ok(next)
    }

    /// Apply several driver overrides in order.
    pub fn with_drivers<'a, I>(&self, overrides: I) -> FeasibilityResult<FinancialAssumptions>
    where
        I: IntoIterator<Item = (&'a Driver, Decimal)>,
    {
        overrides
            .into_iter()
            .try_fold(self.clone(), |acc, (driver, value)| acc.with_driver(driver, value))
    }

    /// Reject inputs outside the model's mathematical domain. Degenerate but
    /// valid cases (zero capex, zero life, zero revenue) pass.
    pub fn validate(&self) -> FeasibilityResult<()> {
        let non_negative = [
            ("total_capex", self.total_capex),
            ("annual_opex_base", self.annual_opex_base),
            ("revenue_per_kw_month", self.revenue_per_kw_month),
            ("it_load_kw", self.it_load_kw),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(FeasibilityError::InvalidInput {
                    field: field.into(),
                    reason: format!("Must be non-negative (got {value})"),
                });
            }
        }

        if self.discount_rate <= dec!(-1) {
            return Err(FeasibilityError::InvalidInput {
                field: "discount_rate".into(),
                reason: "Discount rate must be greater than -100%".into(),
            });
        }

        for (field, value) in [
            ("escalation_rate", self.escalation_rate),
            ("opex_escalation", self.opex_escalation),
        ] {
            if value < dec!(-1) {
                return Err(FeasibilityError::InvalidInput {
                    field: field.into(),
                    reason: "Escalation cannot be below -100%".into(),
                });
            }
        }

        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(FeasibilityError::InvalidInput {
                field: "tax_rate".into(),
                reason: "Tax rate must be in [0, 1)".into(),
            });
        }

        if self.depreciation_years < 1 {
            return Err(FeasibilityError::InvalidInput {
                field: "depreciation_years".into(),
                reason: "Depreciation period must be at least 1 year".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> FinancialAssumptions {
        FinancialAssumptions {
            total_capex: dec!(10_000_000),
            annual_opex_base: dec!(2_000_000),
            revenue_per_kw_month: dec!(150),
            it_load_kw: dec!(2500),
            discount_rate: dec!(0.10),
            project_life_years: 5,
            escalation_rate: dec!(0.03),
            opex_escalation: dec!(0.035),
            occupancy_ramp: None,
            tax_rate: dec!(0.25),
            depreciation_years: 7,
            currency: Currency::USD,
        }
    }

    #[test]
    fn test_full_occupancy_revenue() {
        assert_eq!(sample().full_occupancy_revenue().unwrap(), dec!(4_500_000));
    }

    #[test]
    fn test_with_driver_leaves_base_untouched() {
        let base = sample();
        let bumped = base.with_driver(&Driver::TotalCapex, dec!(12_000_000)).unwrap();
        assert_eq!(bumped.total_capex, dec!(12_000_000));
        assert_eq!(base.total_capex, dec!(10_000_000));
        assert_eq!(bumped.annual_opex_base, base.annual_opex_base);
    }

    #[test]
    fn test_opex_component_shifts_base() {
        let base = sample();
        let staffing = Driver::OpexComponent {
            name: "staffing".into(),
            annual_amount: dec!(800_000),
        };
        assert_eq!(staffing.base_value(&base), dec!(800_000));
        let next = base.with_driver(&staffing, dec!(960_000)).unwrap();
        assert_eq!(next.annual_opex_base, dec!(2_160_000));
        assert_eq!(staffing.label(), "opex:staffing");
    }

    #[test]
    fn test_occupancy_scale_materialises_ramp() {
        let mut base = sample();
        base.occupancy_ramp = Some(vec![dec!(0.5), dec!(1.0)]);
        let next = base.with_driver(&Driver::OccupancyScale, dec!(0.8)).unwrap();
        assert_eq!(
            next.occupancy_ramp,
            Some(vec![dec!(0.40), dec!(0.80), dec!(0.80), dec!(0.80), dec!(0.80)])
        );
    }

    #[test]
    fn test_with_drivers_applies_in_order() {
        let base = sample();
        let overrides = [
            (Driver::TaxRate, dec!(0.30)),
            (Driver::DiscountRate, dec!(0.08)),
        ];
        let next = base.with_drivers(overrides.iter().map(|(d, v)| (d, *v))).unwrap();
        assert_eq!(next.tax_rate, dec!(0.30));
        assert_eq!(next.discount_rate, dec!(0.08));
    }

    #[test]
    fn test_with_driver_overflow_is_an_error() {
        let base = sample();
        let staffing = Driver::OpexComponent {
            name: "staffing".into(),
            annual_amount: Decimal::MIN,
        };
        assert!(matches!(
            base.with_driver(&staffing, Decimal::MAX),
            Err(FeasibilityError::NumericOverflow { .. })
        ));
        let mut oversold = sample();
        oversold.occupancy_ramp = Some(vec![dec!(2)]);
        assert!(oversold.with_driver(&Driver::OccupancyScale, Decimal::MAX).is_err());
    }

    #[test]
    fn test_validation() {
        assert!(sample().validate().is_ok());

        let mut bad = sample();
        bad.total_capex = dec!(-1);
        assert!(bad.validate().is_err());

        let mut bad = sample();
        bad.discount_rate = dec!(-1);
        assert!(bad.validate().is_err());

        let mut bad = sample();
        bad.tax_rate = Decimal::ONE;
        assert!(bad.validate().is_err());

        let mut bad = sample();
        bad.depreciation_years = 0;
        assert!(bad.validate().is_err());

        let mut degenerate = sample();
        degenerate.total_capex = Decimal::ZERO;
        degenerate.project_life_years = 0;
        degenerate.revenue_per_kw_month = Decimal::ZERO;
        assert!(degenerate.validate().is_ok());
    }

    #[test]
    fn test_driver_serde_shape() {
        let json = serde_json::to_value(Driver::RevenuePerKwMonth).unwrap();
        assert_eq!(json, "revenue_per_kw_month");
        let parsed: Driver = serde_json::from_value(serde_json::json!({
            "opex_component": {"name": "security", "annual_amount": "250000"}
        }))
        .unwrap();
        assert_eq!(parsed.label(), "opex:security");
    }
}
