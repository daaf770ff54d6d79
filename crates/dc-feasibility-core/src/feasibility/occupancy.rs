use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// Year-1 occupancy of the default ramp.
pub const DEFAULT_START_OCCUPANCY: Rate = dec!(0.30);
/// Years taken by the default ramp to reach full occupancy.
pub const DEFAULT_RAMP_YEARS: u32 = 4;

/// Where a resolved ramp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampSource {
    /// No ramp supplied; the default ramp was synthesized.
    Default,
    /// Supplied ramp matched the project life.
    Custom,
    /// Supplied ramp was shorter; its last value was repeated.
    Padded { supplied_years: usize },
    /// Supplied ramp was longer; extra years were dropped.
    Truncated { supplied_years: usize },
}

/// An occupancy ramp with exactly one entry per project year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRamp {
    pub values: Vec<Rate>,
    pub source: RampSource,
}

/// Linear ramp from `start` in year 1 to `target` in year `ramp_years`,
/// then flat at `target`.
pub fn linear_ramp(start: Rate, target: Rate, ramp_years: u32, project_life_years: u32) -> Vec<Rate> {
    (0..project_life_years)
        .map(|i| {
            if ramp_years <= 1 || i + 1 >= ramp_years {
                target
            } else {
                let step = (target - start) / Decimal::from(ramp_years - 1);
                start + step * Decimal::from(i)
            }
        })
        .collect()
}

/// Default ramp: 30% in year 1 rising linearly to 100% by year 4.
pub fn default_ramp(project_life_years: u32) -> Vec<Rate> {
    linear_ramp(
        DEFAULT_START_OCCUPANCY,
        Decimal::ONE,
        DEFAULT_RAMP_YEARS,
        project_life_years,
    )
}

/// Fit a supplied ramp to the project life, or synthesize the default one.
/// An empty ramp counts as absent.
pub fn resolve_ramp(custom: Option<&[Rate]>, project_life_years: u32) -> ResolvedRamp {
    let life = project_life_years as usize;
    match custom {
        Some(ramp) if !ramp.is_empty() => {
            let supplied_years = ramp.len();
            let last = ramp[supplied_years - 1];
            let values: Vec<Rate> = (0..life)
                .map(|i| ramp.get(i).copied().unwrap_or(last))
                .collect();
            let source = if supplied_years < life {
                RampSource::Padded { supplied_years }
            } else if supplied_years > life {
                RampSource::Truncated { supplied_years }
            } else {
                RampSource::Custom
            };
            ResolvedRamp { values, source }
        }
        _ => ResolvedRamp {
            values: default_ramp(project_life_years),
            source: RampSource::Default,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_ramp_shape() {
        let ramp = default_ramp(6);
        assert_eq!(ramp.len(), 6);
        assert_eq!(ramp[0], dec!(0.30));
        assert_eq!(ramp[3], Decimal::ONE);
        assert_eq!(ramp[5], Decimal::ONE);
        for pair in ramp.windows(2) {
            assert!(pair[0] <= pair[1], "default ramp must not decrease");
        }
    }

    #[test]
    fn test_linear_ramp_single_year_is_target() {
        assert_eq!(linear_ramp(dec!(0.2), dec!(0.9), 1, 3), vec![dec!(0.9); 3]);
    }

    #[test]
    fn test_pads_with_last_value() {
        let ramp = [dec!(0.3), dec!(0.5)];
        let resolved = resolve_ramp(Some(&ramp), 4);
        assert_eq!(resolved.values, vec![dec!(0.3), dec!(0.5), dec!(0.5), dec!(0.5)]);
        assert_eq!(resolved.source, RampSource::Padded { supplied_years: 2 });
    }

    #[test]
    fn test_truncates_long_ramp() {
        let ramp = [dec!(0.3), dec!(0.5), dec!(0.7)];
        let resolved = resolve_ramp(Some(&ramp), 2);
        assert_eq!(resolved.values, vec![dec!(0.3), dec!(0.5)]);
        assert_eq!(resolved.source, RampSource::Truncated { supplied_years: 3 });
    }

    #[test]
    fn test_empty_ramp_falls_back_to_default() {
        let resolved = resolve_ramp(Some(&[]), 3);
        assert_eq!(resolved.source, RampSource::Default);
        assert_eq!(resolved.values.len(), 3);
    }

    #[test]
    fn test_zero_life() {
        assert!(resolve_ramp(None, 0).values.is_empty());
    }
}
