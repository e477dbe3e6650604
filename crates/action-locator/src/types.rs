//! Core types for locator system

use serde::{Deserialize, Serialize};
use webcycle_core_types::{By, ElementHandle};

/// Outcome of resolving a locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub element: ElementHandle,
    /// Strategy that produced the element
    pub strategy: By,
    /// Position of that strategy in the locator
    pub strategy_index: usize,
}

/// One evaluation tick of a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Resolved(ResolutionResult),
    NotFound,
}

impl Probe {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Probe::Resolved(_))
    }

    pub fn into_resolved(self) -> Option<ResolutionResult> {
        match self {
            Probe::Resolved(result) => Some(result),
            Probe::NotFound => None,
        }
    }
}
