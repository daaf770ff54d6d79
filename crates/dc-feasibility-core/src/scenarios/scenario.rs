use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::FeasibilityError;
use crate::feasibility::assumptions::{Driver, FinancialAssumptions};
use crate::feasibility::payback::payback;
use crate::feasibility::projection::project;
use crate::feasibility::returns;
use crate::types::*;
use crate::FeasibilityResult;

/// One driver pinned to an absolute value within a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverOverride {
    pub driver: Driver,
    pub value: Decimal,
}

/// A named, weighted set of overrides on the base assumptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeasibilityScenario {
    pub name: String,
    pub probability: Rate,
    #[serde(default)]
    pub overrides: Vec<DriverOverride>,
}

/// Input for scenario analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub base: FinancialAssumptions,
    pub scenarios: Vec<FeasibilityScenario>,
}

/// Result for a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub probability: Rate,
    pub npv: Money,
    pub irr: IrrOutcome,
    pub payback_period_years: PaybackOutcome,
    pub discounted_payback_years: PaybackOutcome,
    pub deviation_from_base: Money,
    /// Deviation relative to the base NPV; absent when the base NPV is zero
    pub deviation_pct: Option<Rate>,
}

/// Output of scenario analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub currency: Currency,
    pub base_npv: Money,
    pub results: Vec<ScenarioResult>,
    pub probability_weighted_npv: Money,
}

/// Re-run the projection under each scenario and weight the NPVs.
///
/// Probabilities must each lie in [0, 1] and sum to 1.0 within 0.001.
pub fn analyze_scenarios(
    input: &ScenarioInput,
) -> FeasibilityResult<ComputationOutput<ScenarioOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.scenarios.is_empty() {
        return Err(FeasibilityError::InsufficientData(
            "At least one scenario required".into(),
        ));
    }

    for s in &input.scenarios {
        if s.probability < Decimal::ZERO || s.probability > Decimal::ONE {
            return Err(FeasibilityError::InvalidInput {
                field: format!("scenario:{} probability", s.name),
                reason: "Probability must be between 0 and 1".into(),
            });
        }
    }

    let prob_sum: Decimal = input.scenarios.iter().map(|s| s.probability).sum();
    let prob_tolerance = dec!(0.001);
    let prob_gap = (prob_sum - Decimal::ONE).abs();
    if prob_gap > prob_tolerance {
        return Err(FeasibilityError::InvalidInput {
            field: "probabilities".into(),
            reason: format!("Probabilities must sum to 1.0 (got {prob_sum})"),
        });
    }
    if !prob_gap.is_zero() {
        warnings.push(format!(
            "Probabilities sum to {prob_sum}; treated as approximately 1.0"
        ));
    }

    let base_cashflows = project(&input.base)?;
    let base_npv = returns::npv(&base_cashflows, input.base.discount_rate, input.base.total_capex)?;

    let mut results = Vec::with_capacity(input.scenarios.len());
    let mut probability_weighted_npv = Decimal::ZERO;

    for scenario in &input.scenarios {
        let assumptions = input
            .base
            .with_drivers(scenario.overrides.iter().map(|o| (&o.driver, o.value)))?;
        let rows = project(&assumptions)?;
        let npv = returns::npv(&rows, assumptions.discount_rate, assumptions.total_capex)?;
        let irr = returns::irr(&rows, assumptions.total_capex);
        let paybacks = payback(&rows, assumptions.total_capex);

        let deviation = npv
            .checked_sub(base_npv)
            .ok_or_else(|| FeasibilityError::overflow("deviation from base NPV"))?;
        let deviation_pct = if base_npv.is_zero() {
            if !deviation.is_zero() {
                warnings.push(format!(
                    "Base NPV is zero; cannot compute deviation_pct for scenario '{}'",
                    scenario.name
                ));
            }
            None
        } else {
            let pct = deviation.checked_div(base_npv.abs());
            if pct.is_none() {
                warnings.push(format!(
                    "Deviation for scenario '{}' is too large relative to a base NPV of {base_npv}",
                    scenario.name
                ));
            }
            pct
        };

        probability_weighted_npv = scenario
            .probability
            .checked_mul(npv)
            .and_then(|weighted| probability_weighted_npv.checked_add(weighted))
            .ok_or_else(|| FeasibilityError::overflow("probability-weighted NPV"))?;
        debug!(scenario = %scenario.name, %npv, "scenario evaluated");

        results.push(ScenarioResult {
            name: scenario.name.clone(),
            probability: scenario.probability,
            npv,
            irr,
            payback_period_years: paybacks.nominal,
            discounted_payback_years: paybacks.discounted,
            deviation_from_base: deviation,
            deviation_pct,
        });
    }

    let output = ScenarioOutput {
        currency: input.base.currency.clone(),
        base_npv,
        results,
        probability_weighted_npv,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Probability-weighted Scenario Analysis",
        &serde_json::json!({
            "num_scenarios": input.scenarios.len(),
            "scenarios": input.scenarios.iter().map(|s| &s.name).collect::<Vec<_>>(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
