//! Error types for gate validation

use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;
use webcycle_core_types::ErrorKind;

/// Gate validation error enumeration
#[derive(Debug, Error, Clone)]
pub enum GateError {
    /// Invalid expectation spec
    #[error("Invalid ExpectSpec: {0}")]
    InvalidSpec(String),

    /// Probing the page failed for a reason other than "not yet"
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::InvalidSpec(_) => ErrorKind::Invalid,
            GateError::Action(err) => err.kind(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            GateError::InvalidSpec(_) => false,
            GateError::Action(err) => err.is_retryable(),
        }
    }
}

impl From<LocatorError> for GateError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::Action(inner) => GateError::Action(inner),
            other => GateError::Action(ActionError::Driver(other.to_string())),
        }
    }
}
