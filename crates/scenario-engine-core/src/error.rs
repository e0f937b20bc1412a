use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid range: {field} — {reason}")]
    InvalidRange { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unknown scenario category: {0}")]
    UnknownCategory(String),

    #[error("Conservation violation: allocated {allocated} of {proceeds} proceeds")]
    ConservationViolation { proceeds: Decimal, allocated: Decimal },

    #[error("Duplicate PWERM scenario id: {0}")]
    DuplicateId(u32),

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EngineError {
    pub(crate) fn invalid_range(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidRange {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::SerializationError(e.to_string())
    }
}
