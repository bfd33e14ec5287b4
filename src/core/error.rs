//! Oracle error types

use thiserror::Error;

/// Errors that can occur while configuring or operating the oracle
///
/// Ordinary query failures are not errors: they come back as structured
/// `OracleResponse` values. This type covers setup and plumbing.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A query type name that is not part of the closed enumeration
    #[error("Unknown query type: {0}")]
    UnknownQueryType(String),

    /// A revelation was attempted for a card the holder does not own
    #[error("{holder} does not hold {card}")]
    CardNotHeld { card: String, holder: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempt to read protected state
    #[error(transparent)]
    Integrity(#[from] IntegrityViolation),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl OracleError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        OracleError::Other(msg.into())
    }

    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        OracleError::InvalidConfig(msg.into())
    }
}

/// Which piece of protected state an accessor tried to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedState {
    /// The hidden solution
    Solution,
    /// A holder's private hand
    HolderCards,
}

impl std::fmt::Display for ProtectedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtectedState::Solution => write!(f, "the solution"),
            ProtectedState::HolderCards => write!(f, "a holder's private cards"),
        }
    }
}

/// Hard failure returned when a caller reaches for protected state
///
/// Never downgraded into a response value. Callers that receive one have a
/// bug, not a usage error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Integrity violation: direct access to {target} is forbidden (requested by {requested_by})")]
pub struct IntegrityViolation {
    /// What was requested
    pub target: ProtectedState,
    /// Who asked for it
    pub requested_by: String,
}

impl IntegrityViolation {
    pub fn new(target: ProtectedState, requested_by: impl Into<String>) -> Self {
        Self {
            target,
            requested_by: requested_by.into(),
        }
    }
}

/// Result type alias for oracle operations
pub type OracleResult<T> = Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OracleError::UnknownQueryType("teleport".into());
        assert_eq!(err.to_string(), "Unknown query type: teleport");

        let err = OracleError::invalid_config("duplicate agent");
        assert_eq!(err.to_string(), "Invalid configuration: duplicate agent");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let oracle_err: OracleError = io_err.into();
        assert!(matches!(oracle_err, OracleError::Io(_)));
    }

    #[test]
    fn test_integrity_violation_display() {
        let violation = IntegrityViolation::new(ProtectedState::Solution, "Watson");
        assert_eq!(
            violation.to_string(),
            "Integrity violation: direct access to the solution is forbidden (requested by Watson)"
        );

        let err: OracleError = violation.clone().into();
        assert_eq!(err.to_string(), violation.to_string());
    }
}
