//! Error types shared by every Formix crate
//!
//! Errors unwind to the nearest statement boundary. Nothing here is retried or
//! recovered automatically; the command layer decides what to do next.

use thiserror::Error;

/// Failures raised by a numeric domain primitive
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// `invert` (or a division) applied to the additive identity
    #[error("Division by zero in {domain} domain")]
    DivisionByZero { domain: &'static str },

    /// Integer coercion of a non-integral value
    #[error("Value {value} is not an integer")]
    NotIntegral { value: String },

    /// A cofactor could not be factored into machine-sized primes
    #[error("Factorization overflow: {0}")]
    FactorizationOverflow(String),

    /// A double that has no representation in the domain (NaN, infinities)
    #[error("Value {value} cannot be represented in {domain} domain")]
    Unrepresentable { value: String, domain: &'static str },
}

/// Formix error taxonomy
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormixError {
    /// Bad library descriptor, missing library, factory or parameter
    #[error("Configuration error in {element}: {message}")]
    Configuration { element: String, message: String },

    /// A value was used as the wrong variant
    #[error("Type error in {operation}: expected {expected}, got {got}")]
    TypeMismatch {
        operation: String,
        expected: String,
        got: String,
    },

    /// Argument count outside of the accepted range
    #[error("{function} expects {expected} parameters, got {got}")]
    ParameterCount {
        function: String,
        expected: String,
        got: usize,
    },

    /// The active domain does not provide the requested function
    #[error("Unimplemented function: {function} in {domain} domain")]
    Unimplemented { function: String, domain: String },

    /// A consumer required a calculus mark and found none
    #[error("{consumer} requires {expected}")]
    MissingMetadata { consumer: String, expected: String },

    /// A consumer found a mark it has no algorithm for
    #[error("Unimplemented operation: {consumer} does not handle {kind}")]
    UnrecognizedMetadata { consumer: String, kind: String },

    /// A value already carrying one mark was marked again incompatibly
    #[error("Conflicting annotation: value already marked {existing}, cannot apply {requested}")]
    ConflictingAnnotation { existing: String, requested: String },

    /// The mark on this value was already used up
    #[error("{consumer}: calculus mark already consumed, mark the value again")]
    AlreadyConsumed { consumer: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Undefined symbol: {0}")]
    UndefinedSymbol(String),

    /// The symbol exists but does not evaluate to a value
    #[error("Symbol {0} does not produce a value")]
    NotValueProducing(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl FormixError {
    pub fn type_mismatch(
        operation: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        FormixError::TypeMismatch {
            operation: operation.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn configuration(element: impl Into<String>, message: impl Into<String>) -> Self {
        FormixError::Configuration {
            element: element.into(),
            message: message.into(),
        }
    }

    pub fn unimplemented(function: impl Into<String>, domain: impl Into<String>) -> Self {
        FormixError::Unimplemented {
            function: function.into(),
            domain: domain.into(),
        }
    }
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;

pub type Result<T> = std::result::Result<T, FormixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unimplemented_message_names_function() {
        let err = FormixError::unimplemented("Gamma", "real");
        assert_eq!(err.to_string(), "Unimplemented function: Gamma in real domain");
    }

    #[test]
    fn test_domain_error_converts() {
        let err: FormixError = DomainError::DivisionByZero { domain: "real" }.into();
        assert!(matches!(err, FormixError::Domain(_)));
        assert_eq!(err.to_string(), "Division by zero in real domain");
    }
}
