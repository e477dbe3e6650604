//! Core types for flow orchestration

use std::time::Duration;

use action_context::{ContextDiagnostics, ContextRequirement};
use action_gate::ExpectSpec;
use action_primitives::{ElementState, Interaction, Locator, WaitOptions};
use serde::{Deserialize, Serialize};
use webcycle_core_types::{ErrorKind, WindowHandle};

use crate::errors::FlowError;

const MAX_BACKOFF_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    Fixed,
    /// delay * 2^(attempt-1), capped at 60 seconds
    Exponential,
}

/// Degraded action tried once after every normal attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    /// Replace a pointer click with `arguments[0].click()`
    ScriptClick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub backoff: Backoff,
    #[serde(default)]
    pub fallback: Option<FallbackAction>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
            backoff: Backoff::Fixed,
            fallback: None,
        }
    }

    /// Single attempt, no fallback.
    pub fn once() -> Self {
        Self::new(1, 0)
    }

    pub fn exponential(mut self) -> Self {
        self.backoff = Backoff::Exponential;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackAction) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Delay after the failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = match self.backoff {
            Backoff::Fixed => self.delay_ms,
            Backoff::Exponential => {
                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1));
                self.delay_ms.saturating_mul(multiplier)
            }
        };
        Duration::from_millis(ms.min(MAX_BACKOFF_MS))
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if self.max_attempts == 0 {
            return Err(FlowError::Invalid(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// The step's interaction opens a new top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpawn {
    #[serde(default = "default_spawn_timeout_ms")]
    pub timeout_ms: u64,
    /// Switch the context to the new window once it appears
    #[serde(default = "default_true")]
    pub switch: bool,
}

fn default_spawn_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for WindowSpawn {
    fn default() -> Self {
        Self {
            timeout_ms: default_spawn_timeout_ms(),
            switch: true,
        }
    }
}

/// Named unit of work: context, element, interaction, post-condition.
///
/// Stateless template; every execution yields a fresh [`StepReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStep {
    pub name: String,
    /// `None` keeps whatever context the previous step left
    #[serde(default)]
    pub context: Option<ContextRequirement>,
    #[serde(default)]
    pub locator: Option<Locator>,
    /// Element state to wait for; defaults per interaction
    #[serde(default)]
    pub state: Option<ElementState>,
    #[serde(default)]
    pub wait: Option<WaitOptions>,
    pub interaction: Interaction,
    #[serde(default)]
    pub expect: Option<ExpectSpec>,
    /// Checked once after exhausted failure; success if it holds
    #[serde(default)]
    pub fallback_signal: Option<ExpectSpec>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    #[serde(default)]
    pub best_effort: bool,
    #[serde(default)]
    pub window_spawn: Option<WindowSpawn>,
    /// Pause after a successful step
    #[serde(default)]
    pub settle_ms: u64,
}

impl ActionStep {
    pub fn new(name: impl Into<String>, interaction: Interaction) -> Self {
        Self {
            name: name.into(),
            context: None,
            locator: None,
            state: None,
            wait: None,
            interaction,
            expect: None,
            fallback_signal: None,
            retry: None,
            best_effort: false,
            window_spawn: None,
            settle_ms: 0,
        }
    }

    pub fn on(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn in_context(mut self, context: ContextRequirement) -> Self {
        self.context = Some(context);
        self
    }

    pub fn waiting_for(mut self, state: ElementState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn expect(mut self, spec: ExpectSpec) -> Self {
        self.expect = Some(spec);
        self
    }

    pub fn fallback_signal(mut self, spec: ExpectSpec) -> Self {
        self.fallback_signal = Some(spec);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn spawns_window(mut self, spawn: WindowSpawn) -> Self {
        self.window_spawn = Some(spawn);
        self
    }

    pub fn settle(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default()
    }

    pub fn element_state(&self) -> ElementState {
        self.state
            .unwrap_or_else(|| self.interaction.required_state())
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if self.name.trim().is_empty() {
            return Err(FlowError::Invalid("step name is empty".to_string()));
        }
        let locator_optional = matches!(
            self.interaction,
            Interaction::Navigate { .. } | Interaction::WaitOnly
        );
        if self.locator.is_none() && !locator_optional {
            return Err(FlowError::Invalid(format!(
                "step '{}': {} needs a locator",
                self.name,
                self.interaction.name()
            )));
        }
        if let Some(policy) = &self.retry {
            policy.validate().map_err(|err| {
                FlowError::Invalid(format!("step '{}': {}", self.name, err))
            })?;
            if policy.fallback == Some(FallbackAction::ScriptClick) && !self.interaction.is_pointer()
            {
                return Err(FlowError::Invalid(format!(
                    "step '{}': script_click fallback needs a click interaction",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Progress through one step; a failure is reported by [`StepOutcome`]
/// together with the furthest phase reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    Pending,
    ContextEstablished,
    ElementResolved,
    InteractionApplied,
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Success { confirmed_by_fallback: bool },
    Failure { kind: ErrorKind, reason: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            StepOutcome::Failure { kind, .. } => Some(*kind),
            StepOutcome::Success { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    pub outcome: StepOutcome,
    /// Furthest phase reached before the outcome
    pub phase: StepPhase,
    pub attempts: u32,
    /// The degraded fallback action produced the success
    pub used_fallback_action: bool,
    /// Value read by read_attribute / read_text
    pub value: Option<String>,
    pub new_window: Option<WindowHandle>,
    pub best_effort: bool,
    pub latency_ms: u64,
}

impl StepReport {
    pub fn is_fatal(&self) -> bool {
        self.outcome.failure_kind().is_some_and(|kind| kind.is_fatal())
    }

    /// Failure that ends a scenario: fatal, or from a mandatory step.
    pub fn aborts_scenario(&self) -> bool {
        !self.outcome.is_success() && (self.is_fatal() || !self.best_effort)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<ActionStep>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<ActionStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        self.steps.iter().try_for_each(ActionStep::validate)
    }
}

/// Failed mandatory (or fatal) step that ended a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioFailure {
    pub step: String,
    pub kind: ErrorKind,
    pub message: String,
    pub diagnostics: ContextDiagnostics,
}

/// Tolerated failure of a best-effort step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWarning {
    pub step: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Steps that finished successfully
    pub completed_steps: usize,
    pub failure: Option<ScenarioFailure>,
    pub warnings: Vec<StepWarning>,
    pub reports: Vec<StepReport>,
}

impl ScenarioResult {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclePlan {
    pub steps: Vec<ActionStep>,
    pub iterations: u32,
    pub interval_ms: u64,
    /// Re-established at the start of every iteration
    #[serde(default)]
    pub context: ContextRequirement,
}

impl CyclePlan {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        self.steps.iter().try_for_each(ActionStep::validate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleResult {
    pub iterations_completed: u32,
    /// Best-effort failures, one entry per completed iteration
    pub per_iteration_warnings: Vec<Vec<StepWarning>>,
}

impl CycleResult {
    pub fn warning_count(&self) -> usize {
        self.per_iteration_warnings.iter().map(Vec::len).sum()
    }
}
