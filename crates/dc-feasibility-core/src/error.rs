use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeasibilityError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FeasibilityError {
    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        FeasibilityError::NumericOverflow {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for FeasibilityError {
    fn from(e: serde_json::Error) -> Self {
        FeasibilityError::SerializationError(e.to_string())
    }
}
