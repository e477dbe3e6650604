//! Error types for locator system

use action_primitives::ActionError;
use thiserror::Error;
use webcycle_core_types::ErrorKind;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// No strategy produced an element in the required state before the deadline
    #[error("Element not found: {locator} after {timeout_ms}ms")]
    ElementNotFound { locator: String, timeout_ms: u64 },

    /// A displayed match was still present when waiting for invisibility
    #[error("Element still visible: {locator} after {timeout_ms}ms")]
    StillVisible { locator: String, timeout_ms: u64 },

    /// Driver or context failure while probing
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl LocatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocatorError::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            LocatorError::StillVisible { .. } => ErrorKind::PostConditionFailed,
            LocatorError::Action(err) => err.kind(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::ElementNotFound { .. } | LocatorError::StillVisible { .. } => true,
            LocatorError::Action(err) => err.is_retryable(),
        }
    }
}
