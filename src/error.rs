use thiserror::Error;

/// Errors produced while validating or lowering a query.
///
/// Every variant describes a defect in caller-supplied input. The consuming
/// API layer surfaces these as 4xx-class responses, never as server faults.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("malformed query: {0}")]
    Structural(String),

    #[error("{what} limit exceeded: {actual} (max: {limit})")]
    LimitExceeded {
        what: &'static str,
        limit: usize,
        actual: usize,
    },

    #[error("unknown fields: {}", fields.join(", "))]
    UnknownFields {
        fields: Vec<String>,
        /// Near-miss catalog entries for the diagnostic, may be empty
        suggestions: Vec<String>,
    },

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("unsupported aggregation type: {0}")]
    UnsupportedAggregation(String),

    #[error("unsupported compound type: {0}")]
    UnsupportedCompound(String),

    #[error("operator {operator} {reason}")]
    OperatorValueMismatch { operator: String, reason: String },

    #[error("invalid time range: {0}")]
    TimeRange(String),

    #[error("invalid pagination: {0}")]
    Pagination(String),
}

impl QueryError {
    /// All validator failures are caller-input errors; none indicate a
    /// server fault.
    pub fn is_client_error(&self) -> bool {
        true
    }
}
