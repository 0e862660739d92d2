//! Unified error types for the domain layer
//!
//! Provides a common error type for validation of upstream suggestions,
//! parsing of enum values and review state transitions.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., a suggestion is missing a field its type requires)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Parse error (for enum-like value objects)
    #[error("Parse error: {0}")]
    Parse(String),

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl DomainError {
    /// Creates a validation error for malformed input.
    ///
    /// # Example
    /// ```ignore
    /// if trait_name.trim().is_empty() {
    ///     return Err(DomainError::validation("trait_add requires a trait"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Use this in `FromStr` implementations when the input string
    /// doesn't match any known variant.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid state transition error
    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }
}
