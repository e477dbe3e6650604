//! Locator resolution - multi-strategy element lookup
//!
//! A [`Locator`](action_primitives::Locator) lists strategies in priority
//! order. Every poll tick tries each strategy in that order and stops at the
//! first element that satisfies the requested state; one tick is exposed as
//! [`ElementResolver::probe`] returning an explicit [`Probe`] value.

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
