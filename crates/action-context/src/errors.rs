//! Error types for context transitions

use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;
use webcycle_core_types::ErrorKind;

#[derive(Debug, Error, Clone)]
pub enum ContextError {
    /// The root anchor or a frame segment could not be reached
    #[error("context unreachable at {}: {reason}", describe_segment(.segment))]
    Unreachable {
        /// `None` for the top-level document, else the frame path index
        segment: Option<usize>,
        reason: String,
    },

    #[error("window not found: {target} after {timeout_ms}ms")]
    WindowNotFound { target: String, timeout_ms: u64 },

    /// Reset-and-retry did not bring the context back
    #[error("context unrecoverable: {0}")]
    Unrecoverable(Box<ContextError>),

    #[error("session lost: {0}")]
    SessionLost(String),
}

fn describe_segment(segment: &Option<usize>) -> String {
    match segment {
        Some(index) => format!("frame segment {}", index),
        None => "root document".to_string(),
    }
}

impl ContextError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContextError::Unreachable { .. } => ErrorKind::ContextUnreachable,
            ContextError::WindowNotFound { .. } => ErrorKind::WindowNotFound,
            ContextError::Unrecoverable(_) => ErrorKind::ContextUnrecoverable,
            ContextError::SessionLost(_) => ErrorKind::SessionLost,
        }
    }

    pub fn is_session_lost(&self) -> bool {
        matches!(self, ContextError::SessionLost(_))
    }

    /// Wrap a failure at `segment`, keeping session loss distinct.
    pub(crate) fn at_segment(segment: Option<usize>, err: ActionError) -> Self {
        match err {
            ActionError::SessionLost(message) => ContextError::SessionLost(message),
            other => ContextError::Unreachable {
                segment,
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn locating(segment: Option<usize>, err: LocatorError) -> Self {
        match err {
            LocatorError::Action(inner) => Self::at_segment(segment, inner),
            other => ContextError::Unreachable {
                segment,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_the_failing_segment() {
        let err = ContextError::Unreachable {
            segment: Some(1),
            reason: "not found".into(),
        };
        assert_eq!(err.to_string(), "context unreachable at frame segment 1: not found");
        assert_eq!(err.kind(), ErrorKind::ContextUnreachable);

        let root = ContextError::at_segment(None, ActionError::ElementNotFound("anchor".into()));
        assert!(root.to_string().contains("root document"));
    }

    #[test]
    fn unrecoverable_is_fatal() {
        let err = ContextError::Unrecoverable(Box::new(ContextError::Unreachable {
            segment: Some(0),
            reason: "gone".into(),
        }));
        assert!(err.kind().is_fatal());
        assert!(ContextError::at_segment(Some(0), ActionError::SessionLost("x".into()))
            .is_session_lost());
    }
}
