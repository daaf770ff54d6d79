use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    #[default]
    USD,
    EUR,
    CHF,
    JPY,
    CAD,
    AUD,
    HKD,
    SGD,
    Other(String),
}

/// Why an IRR could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrUndefinedReason {
    /// No upfront investment, so the return is unbounded.
    ZeroInvestment,
    /// No operating years to earn a return over.
    NoCashflows,
    /// NPV keeps the same sign across the whole search bracket.
    NoSignChange,
}

/// Internal rate of return, or the reason it does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IrrOutcome {
    Defined { rate: Rate },
    Undefined { reason: IrrUndefinedReason },
}

impl IrrOutcome {
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrOutcome::Defined { rate } => Some(*rate),
            IrrOutcome::Undefined { .. } => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, IrrOutcome::Defined { .. })
    }
}

/// Payback period, or `Never` when cumulative cash flow stays negative
/// through the whole project life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaybackOutcome {
    Achieved { years: Years },
    Never,
}

impl PaybackOutcome {
    pub fn years(&self) -> Option<Years> {
        match self {
            PaybackOutcome::Achieved { years } => Some(*years),
            PaybackOutcome::Never => None,
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    with_precision(
        methodology,
        assumptions,
        warnings,
        elapsed_us,
        "rust_decimal_128bit",
        result,
    )
}

/// Same as [`with_metadata`] for computations that run in another precision
/// (the Monte Carlo sampler works in f64).
pub fn with_precision<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    precision: &str,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: precision.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_irr_outcome_serializes_tagged() {
        let defined = IrrOutcome::Defined { rate: dec!(0.12) };
        let json = serde_json::to_value(defined).unwrap();
        assert_eq!(json["status"], "defined");
        assert_eq!(json["rate"], "0.12");

        let undefined = IrrOutcome::Undefined {
            reason: IrrUndefinedReason::NoSignChange,
        };
        let json = serde_json::to_value(undefined).unwrap();
        assert_eq!(json["status"], "undefined");
        assert_eq!(json["reason"], "no_sign_change");
        assert_eq!(undefined.rate(), None);
    }

    #[test]
    fn test_payback_never_is_not_zero() {
        let never = PaybackOutcome::Never;
        assert_eq!(never.years(), None);
        let json = serde_json::to_value(never).unwrap();
        assert_eq!(json["status"], "never");
    }

    #[test]
    fn test_with_metadata_echoes_assumptions() {
        let out = with_metadata("test", &serde_json::json!({"a": 1}), vec![], 5, 42u32);
        assert_eq!(out.result, 42);
        assert_eq!(out.assumptions["a"], 1);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }
}
