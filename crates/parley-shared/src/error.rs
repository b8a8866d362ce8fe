use thiserror::Error;

/// Failure to decode a wire DTO into a domain value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid identifier '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Unknown literal '{value}' for {field}")]
    UnknownLiteral { field: &'static str, value: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
