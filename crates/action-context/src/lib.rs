//! Execution context tracking
//!
//! [`ContextManager`] owns the driver handle and is the only component that
//! moves the session between windows and frames. A frame path is only ever
//! reached by resetting to the top-level document and re-descending through
//! every segment in order; the manager never trusts that the driver is still
//! where it was left.

pub mod errors;
pub mod manager;
pub mod types;

pub use errors::*;
pub use manager::*;
pub use types::*;
