//! Flow Orchestration Layer
//!
//! Runs [`ActionStep`]s through their phase state machine, wraps the
//! resolve/interact/verify unit in a [`RetryExecutor`], and composes steps
//! into ordered scenarios and timed refresh cycles. Progress is reported as
//! [`StepEvent`]s to an [`EventSink`].

mod cycle;
pub mod errors;
pub mod events;
pub mod executor;
pub mod retry;
mod scenario;
pub mod types;

pub use errors::FlowError;
pub use events::{BroadcastSink, EventSink, FanoutSink, StepEvent, TracingSink};
pub use executor::StepExecutor;
pub use retry::{Attempt, RetryExecutor, RetryOutcome};
pub use types::*;
