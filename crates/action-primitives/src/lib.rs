//! Action Primitives - Core browser automation operations
//!
//! This crate provides the building blocks the resolver and flow layers
//! compose:
//! - [`Locator`]: ordered multi-strategy element description
//! - bounded polling waits (presence, visibility, clickability, readyState,
//!   custom predicates)
//! - interactions: click, script click, hover-then-click, type, read,
//!   scroll into view, ensure-checked, navigate

pub mod errors;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
