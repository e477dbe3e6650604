//! Flow execution error types

use action_context::ContextError;
use action_gate::GateError;
use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;
use webcycle_core_types::ErrorKind;

use crate::types::CycleResult;

/// Flow execution errors
#[derive(Debug, Error, Clone)]
pub enum FlowError {
    /// Step or plan definition rejected before running
    #[error("Invalid flow definition: {0}")]
    Invalid(String),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Gate(#[from] GateError),

    /// The step's post-condition did not hold within its timeout
    #[error("Post-condition of step '{step}' failed: {reasons}")]
    PostConditionFailed { step: String, reasons: String },

    /// A window-spawning step did not produce exactly one new window
    #[error("Step '{step}' expected one new window: {before} before, {after} after {timeout_ms}ms")]
    WindowNotOpened {
        step: String,
        before: usize,
        after: usize,
        timeout_ms: u64,
    },

    #[error("Retry exhausted after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: Box<FlowError> },

    /// `partial` holds the iterations finished before the abort
    #[error(
        "Cycle aborted in iteration {iteration} after {} completed: {source}",
        .partial.iterations_completed
    )]
    CycleAborted {
        iteration: u32,
        partial: CycleResult,
        source: Box<FlowError>,
    },
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Invalid(_) => ErrorKind::Invalid,
            FlowError::Action(err) => err.kind(),
            FlowError::Locator(err) => err.kind(),
            FlowError::Context(err) => err.kind(),
            FlowError::Gate(err) => err.kind(),
            FlowError::PostConditionFailed { .. } => ErrorKind::PostConditionFailed,
            FlowError::WindowNotOpened { .. } => ErrorKind::WindowNotFound,
            FlowError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            FlowError::CycleAborted { source, .. } => source.kind(),
        }
    }

    /// Session loss and unrecoverable context abort everything.
    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    /// Errors worth another attempt under a retry policy.
    pub fn is_retryable(&self) -> bool {
        !self.is_fatal() && self.kind() != ErrorKind::Invalid
    }

    /// Innermost error, looking through retry exhaustion.
    pub fn root_cause(&self) -> &FlowError {
        match self {
            FlowError::RetryExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}
