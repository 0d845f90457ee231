use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatArbError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No tradable signal: {0}")]
    NoSignal(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StatArbError {
    /// Shorthand used by validators throughout the crate.
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        StatArbError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StatArbError {
    fn from(e: serde_json::Error) -> Self {
        StatArbError::SerializationError(e.to_string())
    }
}
