//! Post-conditions gate
//!
//! An [`ExpectSpec`] groups conditions into all (AND), any (OR) and deny
//! (NOT) sets. The validator polls the spec until it passes or its timeout
//! elapses; fallback success signals reuse the same conditions with a single
//! observation.

pub mod conditions;
pub mod errors;
pub mod types;
pub mod validator;

pub use conditions::*;
pub use errors::*;
pub use types::*;
pub use validator::*;
