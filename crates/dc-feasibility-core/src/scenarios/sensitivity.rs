use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::FeasibilityError;
use crate::feasibility::assumptions::{Driver, FinancialAssumptions};
use crate::feasibility::model::{evaluate_returns, ReturnsSummary};
use crate::types::*;
use crate::FeasibilityResult;

// ---------------------------------------------------------------------------
// Tornado (one-at-a-time) sensitivity
// ---------------------------------------------------------------------------

/// A driver to perturb, optionally with its own perturbation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornadoVariable {
    pub driver: Driver,
    /// Overrides the analysis-wide perturbation for this driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perturbation: Option<Rate>,
}

impl From<Driver> for TornadoVariable {
    fn from(driver: Driver) -> Self {
        TornadoVariable {
            driver,
            perturbation: None,
        }
    }
}

/// Input for a tornado analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornadoInput {
    pub base: FinancialAssumptions,
    pub variables: Vec<TornadoVariable>,
    /// Relative perturbation applied low and high (0.20 = +/-20%)
    #[serde(default = "default_perturbation")]
    pub perturbation: Rate,
}

fn default_perturbation() -> Rate {
    dec!(0.20)
}

/// NPV swing from perturbing one driver while holding the rest at base.
///
/// An end whose perturbed inputs cannot be evaluated (for example a tax rate
/// pushed to 100% or more) carries `None` for its NPV, delta and IRR, and the
/// reason is kept in `failures`. `range` is only defined when both ends are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub variable_name: String,
    pub perturbation: Rate,
    pub base_value: Decimal,
    pub low_value: Decimal,
    pub high_value: Decimal,
    pub npv_at_low: Option<Money>,
    pub npv_at_high: Option<Money>,
    /// npv_at_low - base NPV
    pub low_delta: Option<Money>,
    /// npv_at_high - base NPV
    pub high_delta: Option<Money>,
    /// |high_delta - low_delta|, the tornado bar width
    pub range: Option<Money>,
    pub irr_at_low: Option<IrrOutcome>,
    pub irr_at_high: Option<IrrOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl SensitivityResult {
    /// Both ends evaluated.
    pub fn is_complete(&self) -> bool {
        self.range.is_some()
    }
}

/// Output of a tornado analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornadoOutput {
    pub currency: Currency,
    pub base_npv: Money,
    pub base_irr: IrrOutcome,
    /// Sorted by descending range; incomplete variables last
    pub results: Vec<SensitivityResult>,
}

fn validate_perturbation(name: &str, perturbation: Rate) -> FeasibilityResult<()> {
    if perturbation < Decimal::ZERO || perturbation > Decimal::ONE {
        return Err(FeasibilityError::InvalidInput {
            field: format!("perturbation:{name}"),
            reason: "Perturbation must be between 0 and 1".into(),
        });
    }
    Ok(())
}

/// One-at-a-time sensitivity of NPV to each variable.
///
/// Every low and high run re-projects a fresh assumption set built with
/// [`FinancialAssumptions::with_driver`]; `base` itself is never modified.
/// Results are sorted by descending range, ties keeping input order.
/// Variables with an end outside the model's domain follow the ranked ones.
pub fn analyze(
    base: &FinancialAssumptions,
    variables: &[TornadoVariable],
    perturbation: Rate,
) -> FeasibilityResult<Vec<SensitivityResult>> {
    validate_perturbation("default", perturbation)?;
    let base_returns = evaluate_returns(base)?;
    rank_variables(base, &base_returns, variables, perturbation)
}

fn rank_variables(
    base: &FinancialAssumptions,
    base_returns: &ReturnsSummary,
    variables: &[TornadoVariable],
    perturbation: Rate,
) -> FeasibilityResult<Vec<SensitivityResult>> {
    let mut results = Vec::with_capacity(variables.len());
    for variable in variables {
        let name = variable.driver.label();
        let p = variable.perturbation.unwrap_or(perturbation);
        validate_perturbation(&name, p)?;

        let base_value = variable.driver.base_value(base);
        let low_value = base_value
            .checked_mul(Decimal::ONE - p)
            .ok_or_else(|| FeasibilityError::overflow(format!("low value of {name}")))?;
        let high_value = base_value
            .checked_mul(Decimal::ONE + p)
            .ok_or_else(|| FeasibilityError::overflow(format!("high value of {name}")))?;

        let mut failures = Vec::new();
        let mut run = |end: &str, value: Decimal| {
            let outcome = base
                .with_driver(&variable.driver, value)
                .and_then(|next| evaluate_returns(&next))
                .and_then(|r| {
                    let delta = r
                        .npv
                        .checked_sub(base_returns.npv)
                        .ok_or_else(|| FeasibilityError::overflow("NPV delta"))?;
                    Ok((r, delta))
                });
            match outcome {
                Ok(end_result) => Some(end_result),
                Err(e) => {
                    debug!(variable = %name, end, error = %e, "tornado: end not evaluated");
                    failures.push(format!("{end} ({value}): {e}"));
                    None
                }
            }
        };
        let low = run("low", low_value);
        let high = run("high", high_value);

        let range = match (&low, &high) {
            (Some((_, lo)), Some((_, hi))) => hi.checked_sub(*lo).map(|d| d.abs()),
            _ => None,
        };

        results.push(SensitivityResult {
            variable_name: name,
            perturbation: p,
            base_value,
            low_value,
            high_value,
            npv_at_low: low.map(|(r, _)| r.npv),
            npv_at_high: high.map(|(r, _)| r.npv),
            low_delta: low.map(|(_, d)| d),
            high_delta: high.map(|(_, d)| d),
            range,
            irr_at_low: low.map(|(r, _)| r.irr),
            irr_at_high: high.map(|(r, _)| r.irr),
            failures,
        });
    }

    // Some(range) sorts above None under Reverse
    results.sort_by_key(|r| std::cmp::Reverse(r.range));
    debug!(variables = results.len(), "tornado: analysis complete");
    Ok(results)
}

/// Run [`analyze`] and wrap the ranked results with metadata.
pub fn tornado_analysis(input: &TornadoInput) -> FeasibilityResult<ComputationOutput<TornadoOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.variables.is_empty() {
        return Err(FeasibilityError::InsufficientData(
            "At least one sensitivity variable required".into(),
        ));
    }

    validate_perturbation("default", input.perturbation)?;
    let base_returns = evaluate_returns(&input.base)?;
    let results = rank_variables(&input.base, &base_returns, &input.variables, input.perturbation)?;

    for r in &results {
        for failure in &r.failures {
            warnings.push(format!(
                "{} could not be evaluated at the {failure}; excluded from ranking",
                r.variable_name
            ));
        }
        if let (Some(low), Some(high)) = (r.irr_at_low, r.irr_at_high) {
            if low.is_defined() != high.is_defined() {
                warnings.push(format!(
                    "IRR is undefined at one end of the {} range",
                    r.variable_name
                ));
            }
        }
        if r.base_value.is_zero() {
            warnings.push(format!(
                "{} is zero at base; a relative perturbation has no effect",
                r.variable_name
            ));
        }
    }

    let output = TornadoOutput {
        currency: input.base.currency.clone(),
        base_npv: base_returns.npv,
        base_irr: base_returns.irr,
        results,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-at-a-time NPV Sensitivity (Tornado)",
        &serde_json::json!({
            "variables": input.variables.iter().map(|v| v.driver.label()).collect::<Vec<_>>(),
            "perturbation": input.perturbation.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Two-way NPV grid
// ---------------------------------------------------------------------------

/// One axis of a two-way sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridAxis {
    pub driver: Driver,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Input for a two-way NPV sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvGridInput {
    pub base: FinancialAssumptions,
    pub axis_1: GridAxis,
    pub axis_2: GridAxis,
}

/// Output of a two-way NPV sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvGridOutput {
    pub currency: Currency,
    pub axis_1_name: String,
    pub axis_2_name: String,
    pub axis_1_values: Vec<Decimal>,
    pub axis_2_values: Vec<Decimal>,
    /// matrix[i][j] = NPV at axis_1_values[i], axis_2_values[j]; `None`
    /// where the perturbed inputs were invalid
    pub matrix: Vec<Vec<Option<Money>>>,
    /// NPV of the unmodified base case
    pub base_case_value: Money,
    /// Cell closest to the base values (row, col)
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values for an axis from min to max with step.
fn generate_sweep_values(axis: &GridAxis) -> FeasibilityResult<Vec<Decimal>> {
    let name = axis.driver.label();
    if axis.step <= Decimal::ZERO {
        return Err(FeasibilityError::InvalidInput {
            field: format!("axis:{name}"),
            reason: "Step must be positive".into(),
        });
    }
    if axis.min > axis.max {
        return Err(FeasibilityError::InvalidInput {
            field: format!("axis:{name}"),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = axis.min;
    while current <= axis.max {
        values.push(current);
        match current.checked_add(axis.step) {
            Some(next) => current = next,
            None => break,
        }
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < axis.max {
            values.push(axis.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| v.checked_sub(target).map_or(Decimal::MAX, |d| d.abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Sweep two drivers jointly and tabulate NPV.
pub fn npv_grid(input: &NpvGridInput) -> FeasibilityResult<ComputationOutput<NpvGridOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.axis_1.driver == input.axis_2.driver {
        return Err(FeasibilityError::InvalidInput {
            field: "axis_2".into(),
            reason: "Grid axes must use different drivers".into(),
        });
    }

    let v1_values = generate_sweep_values(&input.axis_1)?;
    let v2_values = generate_sweep_values(&input.axis_2)?;
    let base_case_value = evaluate_returns(&input.base)?.npv;

    let mut matrix = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            let cell = input
                .base
                .with_drivers([(&input.axis_1.driver, *v1), (&input.axis_2.driver, *v2)])
                .and_then(|cell| evaluate_returns(&cell));
            match cell {
                Ok(r) => row.push(Some(r.npv)),
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({v1}, {v2}): {e}"));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    let base_row = closest_index(&v1_values, input.axis_1.driver.base_value(&input.base));
    let base_col = closest_index(&v2_values, input.axis_2.driver.base_value(&input.base));

    let output = NpvGridOutput {
        currency: input.base.currency.clone(),
        axis_1_name: input.axis_1.driver.label(),
        axis_2_name: input.axis_2.driver.label(),
        axis_1_values: v1_values,
        axis_2_values: v2_values,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way NPV Sensitivity Grid",
        &serde_json::json!({
            "axis_1": input.axis_1.driver.label(),
            "axis_2": input.axis_2.driver.label(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
