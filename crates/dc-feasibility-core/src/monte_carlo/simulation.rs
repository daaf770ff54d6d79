use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{LogNormal, Normal, Triangular, Uniform};
use std::time::Instant;
use tracing::{debug, trace};

use crate::error::FeasibilityError;
use crate::feasibility::assumptions::{Driver, FinancialAssumptions};
use crate::feasibility::model::evaluate_returns;
use crate::types::{with_precision, ComputationOutput, Currency};
use crate::FeasibilityResult;

/// Minimum number of paths accepted by [`simulate_npv`].
pub const MIN_SIMULATIONS: u32 = 100;

const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Probability distribution specification for a Monte Carlo driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McDistribution {
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    Uniform { min: f64, max: f64 },
}

/// A driver drawn independently on every path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McDriver {
    pub driver: Driver,
    pub distribution: McDistribution,
}

/// Input for a Monte Carlo NPV simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McFeasibilityInput {
    pub base: FinancialAssumptions,
    pub variables: Vec<McDriver>,
    /// Number of simulation paths (minimum 100).
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
}

fn default_num_simulations() -> u32 {
    10_000
}

/// Percentile summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// A single histogram bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

/// Output of a Monte Carlo NPV simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McNpvOutput {
    pub currency: Currency,
    pub num_simulations: u32,
    /// Paths that produced an NPV
    pub valid_paths: u32,
    /// Paths whose drawn inputs failed validation
    pub skipped_paths: u32,
    pub npv_mean: f64,
    pub npv_std_dev: f64,
    pub npv_min: f64,
    pub npv_max: f64,
    pub npv_percentiles: McPercentiles,
    /// Share of valid paths with NPV > 0
    pub probability_positive_npv: f64,
    /// Median IRR over paths where it is defined
    pub irr_median: Option<f64>,
    pub irr_defined_paths: u32,
    pub histogram: Vec<HistogramBin>,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

fn invalid_distribution(driver: &Driver, kind: &str, e: impl std::fmt::Display) -> FeasibilityError {
    FeasibilityError::InvalidInput {
        field: format!("distribution:{}", driver.label()),
        reason: format!("Invalid {kind} parameters: {e}"),
    }
}

/// Sample a single value from the given distribution using the provided RNG.
fn sample(rng: &mut StdRng, var: &McDriver) -> FeasibilityResult<f64> {
    let driver = &var.driver;
    match &var.distribution {
        McDistribution::Normal { mean, std_dev } => {
            let n = Normal::new(*mean, *std_dev)
                .map_err(|e| invalid_distribution(driver, "Normal", e))?;
            Ok(rng.sample(n))
        }
        McDistribution::LogNormal { mu, sigma } => {
            let ln = LogNormal::new(*mu, *sigma)
                .map_err(|e| invalid_distribution(driver, "LogNormal", e))?;
            Ok(rng.sample(ln))
        }
        McDistribution::Triangular { min, mode, max } => {
            let t = Triangular::new(*min, *max, *mode)
                .map_err(|e| invalid_distribution(driver, "Triangular", e))?;
            Ok(rng.sample(t))
        }
        McDistribution::Uniform { min, max } => {
            let u = Uniform::new(*min, *max)
                .map_err(|e| invalid_distribution(driver, "Uniform", e))?;
            Ok(rng.sample(u))
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Percentile of a non-empty **sorted** slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

fn percentiles(sorted: &[f64]) -> McPercentiles {
    McPercentiles {
        p5: percentile_sorted(sorted, 5.0),
        p10: percentile_sorted(sorted, 10.0),
        p25: percentile_sorted(sorted, 25.0),
        p50: percentile_sorted(sorted, 50.0),
        p75: percentile_sorted(sorted, 75.0),
        p90: percentile_sorted(sorted, 90.0),
        p95: percentile_sorted(sorted, 95.0),
    }
}

/// Build a histogram with `num_bins` equal-width bins over a sorted slice.
fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let min_val = sorted[0];
    let max_val = sorted[sorted.len() - 1];

    // All paths landed on the same value
    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let n = sorted.len() as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| {
            let lower = min_val + i as f64 * bin_width;
            let upper = if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            };
            HistogramBin {
                lower,
                upper,
                count: 0,
                frequency: 0.0,
            }
        })
        .collect();

    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }

    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }

    bins
}

fn sort_f64(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Monte Carlo distribution of project NPV.
///
/// On every path each listed driver is drawn from its distribution and
/// applied to the base assumptions, then the pro forma is re-projected.
/// Paths whose drawn inputs fail validation (a tax rate of 1.2, a negative
/// load) are skipped and counted. Statistics are computed in f64.
pub fn simulate_npv(
    input: &McFeasibilityInput,
) -> FeasibilityResult<ComputationOutput<McNpvOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.num_simulations < MIN_SIMULATIONS {
        return Err(FeasibilityError::InvalidInput {
            field: "num_simulations".into(),
            reason: format!("Must be at least {MIN_SIMULATIONS}"),
        });
    }
    if input.variables.is_empty() {
        return Err(FeasibilityError::InsufficientData(
            "At least one variable is required".into(),
        ));
    }
    input.base.validate()?;

    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let n = input.num_simulations as usize;
    let mut npvs: Vec<f64> = Vec::with_capacity(n);
    let mut irrs: Vec<f64> = Vec::new();
    let mut skipped: u32 = 0;
    let mut draws: Vec<(&Driver, Decimal)> = Vec::with_capacity(input.variables.len());

    for path in 0..n {
        draws.clear();
        let mut drawable = true;
        for var in &input.variables {
            let x = sample(&mut rng, var)?;
            match Decimal::from_f64(x) {
                Some(value) => draws.push((&var.driver, value)),
                None => drawable = false,
            }
        }
        if !drawable {
            skipped += 1;
            continue;
        }

        let evaluated = input
            .base
            .with_drivers(draws.iter().copied())
            .and_then(|assumptions| evaluate_returns(&assumptions));
        match evaluated {
            Ok(returns) => {
                npvs.push(returns.npv.to_f64().unwrap_or(f64::NAN));
                if let Some(rate) = returns.irr.rate().and_then(|r| r.to_f64()) {
                    irrs.push(rate);
                }
            }
            Err(e) => {
                trace!(path, error = %e, "monte carlo: path skipped");
                skipped += 1;
            }
        }
    }

    npvs.retain(|v| v.is_finite());
    if npvs.is_empty() {
        return Err(FeasibilityError::InsufficientData(
            "Every simulated path produced invalid assumptions".into(),
        ));
    }
    if skipped > 0 {
        warnings.push(format!(
            "{skipped} of {} simulations skipped (drawn inputs failed validation)",
            input.num_simulations
        ));
    }

    sort_f64(&mut npvs);
    let valid_n = npvs.len() as f64;
    let npv_mean = npvs.iter().sum::<f64>() / valid_n;
    let npv_variance = npvs.iter().map(|v| (v - npv_mean).powi(2)).sum::<f64>() / valid_n;
    let positive = npvs.iter().filter(|v| **v > 0.0).count() as f64;

    let irr_median = if irrs.is_empty() {
        warnings.push("IRR is undefined on every simulated path".into());
        None
    } else {
        sort_f64(&mut irrs);
        Some(percentile_sorted(&irrs, 50.0))
    };

    debug!(
        valid = npvs.len(),
        skipped,
        mean = npv_mean,
        "monte carlo: simulation complete"
    );

    let output = McNpvOutput {
        currency: input.base.currency.clone(),
        num_simulations: input.num_simulations,
        valid_paths: npvs.len() as u32,
        skipped_paths: skipped,
        npv_mean,
        npv_std_dev: npv_variance.sqrt(),
        npv_min: npvs[0],
        npv_max: npvs[npvs.len() - 1],
        npv_percentiles: percentiles(&npvs),
        probability_positive_npv: positive / valid_n,
        irr_median,
        irr_defined_paths: irrs.len() as u32,
        histogram: build_histogram(&npvs, HISTOGRAM_BINS),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_precision(
        "Monte Carlo NPV Simulation",
        &serde_json::json!({
            "num_simulations": input.num_simulations,
            "seed": input.seed,
            "variables": input.variables.iter().map(|v| v.driver.label()).collect::<Vec<_>>(),
        }),
        warnings,
        elapsed,
        "ieee754_f64",
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use rust_decimal_macros::dec;

    fn baseline() -> FinancialAssumptions {
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

    fn price_input(seed: u64) -> McFeasibilityInput {
        McFeasibilityInput {
            base: baseline(),
            variables: vec![McDriver {
                driver: Driver::RevenuePerKwMonth,
                distribution: McDistribution::Uniform {
                    min: 130.0,
                    max: 170.0,
                },
            }],
            num_simulations: 2_000,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_seeded_reproducibility() {
        let a = simulate_npv(&price_input(42)).unwrap().result;
        let b = simulate_npv(&price_input(42)).unwrap().result;
        assert_eq!(a.npv_mean, b.npv_mean);
        assert_eq!(a.npv_percentiles.p50, b.npv_percentiles.p50);
    }

    #[test]
    fn test_symmetric_price_draws_center_on_base() {
        // NPV is linear in price here, so the mean tracks the base NPV
        // (about 4.44M) within sampling noise.
        let out = simulate_npv(&price_input(7)).unwrap().result;
        assert_eq!(out.skipped_paths, 0);
        assert!((out.npv_mean - 4_444_745.65).abs() < 150_000.0);
        assert!(out.probability_positive_npv > 0.95);
        assert!(out.irr_median.unwrap() > 0.15 && out.irr_median.unwrap() < 0.25);
    }

    #[test]
    fn test_percentile_ordering() {
        let out = simulate_npv(&price_input(1)).unwrap().result;
        let p = &out.npv_percentiles;
        assert!(out.npv_min <= p.p5);
        assert!(p.p5 <= p.p25 && p.p25 <= p.p50 && p.p50 <= p.p75 && p.p75 <= p.p95);
        assert!(p.p95 <= out.npv_max);
    }

    #[test]
    fn test_histogram_counts_every_valid_path() {
        let out = simulate_npv(&price_input(3)).unwrap().result;
        assert_eq!(out.histogram.len(), HISTOGRAM_BINS);
        let total: u32 = out.histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, out.valid_paths);
        let freq: f64 = out.histogram.iter().map(|b| b.frequency).sum();
        assert!((freq - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_draws_are_skipped() {
        let input = McFeasibilityInput {
            base: baseline(),
            variables: vec![McDriver {
                driver: Driver::TaxRate,
                distribution: McDistribution::Uniform { min: 0.5, max: 1.5 },
            }],
            num_simulations: 500,
            seed: Some(11),
        };
        let out = simulate_npv(&input).unwrap();
        assert!(out.result.skipped_paths > 0);
        assert_eq!(
            out.result.valid_paths + out.result.skipped_paths,
            input.num_simulations
        );
        assert!(out.warnings.iter().any(|w| w.contains("skipped")));
    }

    #[test]
    fn test_all_paths_invalid_is_an_error() {
        let input = McFeasibilityInput {
            base: baseline(),
            variables: vec![McDriver {
                driver: Driver::ItLoadKw,
                distribution: McDistribution::Uniform {
                    min: -200.0,
                    max: -100.0,
                },
            }],
            num_simulations: 100,
            seed: Some(5),
        };
        assert!(matches!(
            simulate_npv(&input),
            Err(FeasibilityError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_min_simulations_validation() {
        let mut input = price_input(1);
        input.num_simulations = 99;
        assert!(simulate_npv(&input).is_err());
    }

    #[test]
    fn test_empty_variables_validation() {
        let mut input = price_input(1);
        input.variables.clear();
        assert!(simulate_npv(&input).is_err());
    }

    #[test]
    fn test_invalid_distribution_parameters() {
        let mut input = price_input(1);
        input.variables[0].distribution = McDistribution::Normal {
            mean: 150.0,
            std_dev: -1.0,
        };
        assert!(matches!(
            simulate_npv(&input),
            Err(FeasibilityError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_metadata_precision_field() {
        let out = simulate_npv(&price_input(2)).unwrap();
        assert_eq!(out.metadata.precision, "ieee754_f64");
    }
}
