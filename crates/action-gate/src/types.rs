//! Core types for post-conditions gate

use action_primitives::WaitOptions;
use serde::{Deserialize, Serialize};

use crate::conditions::Condition;

/// ExpectSpec - Rule model for post-condition validation
///
/// Uses three rule categories: all (AND), any (OR), deny (NOT).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectSpec {
    /// Timeout for validation in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,

    /// All conditions must pass (AND logic)
    #[serde(default)]
    pub all: Vec<Condition>,

    /// At least one condition must pass (OR logic)
    #[serde(default)]
    pub any: Vec<Condition>,

    /// None of these conditions should pass (NOT logic)
    #[serde(default)]
    pub deny: Vec<Condition>,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_poll_ms() -> u64 {
    250
}

impl ExpectSpec {
    /// Create a new ExpectSpec with default timeout
    pub fn new() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_ms(),
            all: Vec::new(),
            any: Vec::new(),
            deny: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_all(mut self, condition: Condition) -> Self {
        self.all.push(condition);
        self
    }

    pub fn with_any(mut self, condition: Condition) -> Self {
        self.any.push(condition);
        self
    }

    pub fn with_deny(mut self, condition: Condition) -> Self {
        self.deny.push(condition);
        self
    }

    pub fn has_conditions(&self) -> bool {
        !self.all.is_empty() || !self.any.is_empty() || !self.deny.is_empty()
    }

    pub fn condition_count(&self) -> usize {
        self.all.len() + self.any.len() + self.deny.len()
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new(self.timeout_ms, self.poll_interval_ms)
    }
}

impl Default for ExpectSpec {
    fn default() -> Self {
        Self::new()
    }
}

/// Gate validation result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    pub passed: bool,
    /// Failing conditions of the last evaluation
    pub reasons: Vec<String>,
    /// Evaluations performed before the verdict
    pub evaluations: u32,
    pub latency_ms: u64,
}

impl GateResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    pub fn fail(reasons: Vec<String>) -> Self {
        Self {
            passed: false,
            reasons,
            ..Self::default()
        }
    }

    pub fn summary(&self) -> String {
        if self.passed {
            "passed".to_string()
        } else {
            self.reasons.join("; ")
        }
    }
}
