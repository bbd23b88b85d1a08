//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid agent configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid workflow plan: {0}")]
    InvalidPlan(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::UnknownRole("x".to_string()).is_cancelled());
        assert!(!DomainError::InvalidPlan("cycle".to_string()).is_cancelled());
    }

    #[test]
    fn test_transition_error_display() {
        let error = DomainError::InvalidTransition {
            from: "completed".to_string(),
            to: "reasoning".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid state transition from completed to reasoning"
        );
    }
}
