use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing expiry: provide either time_to_expiry or expiry_date")]
    MissingExpiry,

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::SerializationError(e.to_string())
    }
}

impl From<chrono::ParseError> for PricingError {
    fn from(e: chrono::ParseError) -> Self {
        PricingError::DateError(e.to_string())
    }
}
