pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "feasibility")]
pub mod feasibility;

#[cfg(any(feature = "sensitivity", feature = "scenarios"))]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::FeasibilityError;
pub use types::*;

/// Standard result type for all feasibility operations
pub type FeasibilityResult<T> = Result<T, FeasibilityError>;
