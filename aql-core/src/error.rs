//! Error types for aql-core.
//!
//! Compile-time errors only. Execution and action failures live in the runtime crate.

use thiserror::Error;

/// AQL compilation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AqlError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Domain mismatch: {0}")]
    DomainMismatch(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unsupported comparator: {0}")]
    UnsupportedComparator(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for AQL compilation
pub type AqlResult<T> = Result<T, AqlError>;

impl serde::Serialize for AqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AqlError::ParseError("unexpected token".to_string());
        assert_eq!(err.to_string(), "Parse error: unexpected token");

        let err = AqlError::UnknownField("item.colour".to_string());
        assert_eq!(err.to_string(), "Unknown field: item.colour");

        let err = AqlError::MalformedQuery("unbalanced parenthesis".to_string());
        assert_eq!(err.to_string(), "Malformed query: unbalanced parenthesis");

        let err = AqlError::InvalidSort("size is not a result field".to_string());
        assert_eq!(err.to_string(), "Invalid sort: size is not a result field");
    }

    #[test]
    fn test_error_serializes_as_message() {
        let err = AqlError::UnknownDomain("repos".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Unknown domain: repos\"");
    }
}
