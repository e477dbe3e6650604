//! Error types for action primitives

use thiserror::Error;
use webcycle_core_types::ErrorKind;
use webcycle_driver::{DriverError, DriverErrorKind};

/// Error types for locator, wait and interaction operations
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// No strategy produced an element in the required state
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element is hidden, disabled or obscured
    #[error("Element not interactable: {0}")]
    NotClickable(String),

    /// A bounded wait elapsed without the condition holding
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// The addressed frame or window vanished
    #[error("Context lost: {0}")]
    ContextLost(String),

    #[error("Session lost: {0}")]
    SessionLost(String),

    /// Script or transport level driver failure
    #[error("Driver error: {0}")]
    Driver(String),

    /// Malformed locator or interaction definition
    #[error("Invalid action: {0}")]
    Invalid(String),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::ElementNotFound(_) => ErrorKind::ElementNotFound,
            ActionError::NotClickable(_) => ErrorKind::ElementNotInteractable,
            ActionError::WaitTimeout(_) => ErrorKind::PostConditionFailed,
            ActionError::ContextLost(_) => ErrorKind::ContextUnreachable,
            ActionError::SessionLost(_) => ErrorKind::SessionLost,
            ActionError::Driver(_) => ErrorKind::Driver,
            ActionError::Invalid(_) => ErrorKind::Invalid,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::ElementNotFound(_)
                | ActionError::NotClickable(_)
                | ActionError::WaitTimeout(_)
                | ActionError::ContextLost(_)
                | ActionError::Driver(_)
        )
    }
}

impl From<DriverError> for ActionError {
    fn from(err: DriverError) -> Self {
        let message = err.to_string();
        match err.kind {
            DriverErrorKind::NoSuchElement | DriverErrorKind::StaleElement => {
                ActionError::ElementNotFound(message)
            }
            DriverErrorKind::NotInteractable => ActionError::NotClickable(message),
            DriverErrorKind::NoSuchFrame | DriverErrorKind::NoSuchWindow => {
                ActionError::ContextLost(message)
            }
            DriverErrorKind::SessionLost => ActionError::SessionLost(message),
            DriverErrorKind::Timeout => ActionError::WaitTimeout(message),
            DriverErrorKind::Script | DriverErrorKind::Internal => ActionError::Driver(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_errors_map_to_action_errors() {
        let err: ActionError = DriverError::new(DriverErrorKind::NotInteractable).into();
        assert_eq!(err.kind(), ErrorKind::ElementNotInteractable);
        assert!(err.is_retryable());

        let err: ActionError = DriverError::session_lost("gone").into();
        assert_eq!(err.kind(), ErrorKind::SessionLost);
        assert!(!err.is_retryable());
    }
}
