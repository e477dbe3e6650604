//! Error surface of the driver capability

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// High-level error categories surfaced by a driver.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverErrorKind {
    #[error("no such element")]
    NoSuchElement,
    #[error("stale element reference")]
    StaleElement,
    #[error("element not interactable")]
    NotInteractable,
    #[error("no such frame")]
    NoSuchFrame,
    #[error("no such window")]
    NoSuchWindow,
    #[error("session lost")]
    SessionLost,
    #[error("script error")]
    Script,
    #[error("driver timeout")]
    Timeout,
    #[error("internal driver error")]
    Internal,
}

/// Enriched error metadata passed back to the engine layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub hint: Option<String>,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

impl DriverError {
    pub fn new(kind: DriverErrorKind) -> Self {
        Self { kind, hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn session_lost(hint: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::SessionLost).with_hint(hint)
    }

    pub fn is_session_lost(&self) -> bool {
        self.kind == DriverErrorKind::SessionLost
    }

    /// Errors that only mean "the DOM moved under us"; polling loops treat
    /// them as a negative observation and keep going.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            DriverErrorKind::NoSuchElement
                | DriverErrorKind::StaleElement
                | DriverErrorKind::NotInteractable
                | DriverErrorKind::Timeout
        )
    }

    /// The addressed window or frame no longer exists.
    pub fn is_context_loss(&self) -> bool {
        matches!(
            self.kind,
            DriverErrorKind::NoSuchFrame | DriverErrorKind::NoSuchWindow
        )
    }
}

pub type DriverResult<T> = Result<T, DriverError>;
