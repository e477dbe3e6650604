//! Core data types for action primitives

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webcycle_core_types::By;

use crate::errors::ActionError;

/// Ordered, non-empty list of finding strategies for one element.
///
/// Strategies are tried in declared order on every poll tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<By>", into = "Vec<By>")]
pub struct Locator {
    strategies: Vec<By>,
}

impl Locator {
    pub fn new(strategies: Vec<By>) -> Result<Self, ActionError> {
        if strategies.is_empty() {
            return Err(ActionError::Invalid(
                "locator needs at least one strategy".to_string(),
            ));
        }
        if let Some(empty) = strategies.iter().find(|by| by.value().trim().is_empty()) {
            return Err(ActionError::Invalid(format!(
                "empty selector for strategy '{}'",
                empty.kind()
            )));
        }
        // `.a b` would select descendants, not an element with both classes
        if let Some(compound) = strategies.iter().find(|by| {
            matches!(by, By::ClassName(value) if value.trim().contains(char::is_whitespace))
        }) {
            return Err(ActionError::Invalid(format!(
                "class_name '{}' must be a single class; use css for compound selectors",
                compound.value()
            )));
        }
        Ok(Self { strategies })
    }

    pub fn single(by: By) -> Self {
        Self {
            strategies: vec![by],
        }
    }

    pub fn strategies(&self) -> &[By] {
        &self.strategies
    }

    pub fn primary(&self) -> &By {
        &self.strategies[0]
    }
}

impl TryFrom<Vec<By>> for Locator {
    type Error = ActionError;

    fn try_from(value: Vec<By>) -> Result<Self, Self::Error> {
        Locator::new(value)
    }
}

impl From<Locator> for Vec<By> {
    fn from(value: Locator) -> Self {
        value.strategies
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.strategies.iter().map(|by| by.to_string()).collect();
        write!(f, "[{}]", parts.join(" | "))
    }
}

/// State an element must be in to count as resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    Present,
    Visible,
    #[default]
    Clickable,
}

/// Bounds of one polling wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    pub timeout_ms: u64,
    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_ms() -> u64 {
    250
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            poll_interval_ms: default_poll_ms(),
        }
    }
}

impl WaitOptions {
    pub fn new(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll quantum, never zero so a wait cannot spin.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Interaction applied to a resolved element (or to the page for the
/// locator-less variants).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Interaction {
    Click,
    /// `arguments[0].click()`; ignores overlays and visibility
    ScriptClick,
    /// Pointer move onto the element, a short pause, then a native click
    HoverClick {
        #[serde(default = "default_hover_pause_ms")]
        pause_ms: u64,
    },
    Type {
        text: String,
        #[serde(default)]
        clear: bool,
    },
    ReadAttribute {
        name: String,
    },
    ReadText,
    ScrollIntoView,
    /// Click only when `attribute` does not already contain `marker`
    EnsureChecked {
        #[serde(default = "default_checked_attribute")]
        attribute: String,
        #[serde(default = "default_checked_marker")]
        marker: String,
    },
    Navigate {
        url: String,
    },
    WaitOnly,
}

fn default_hover_pause_ms() -> u64 {
    300
}

fn default_checked_attribute() -> String {
    "class".to_string()
}

fn default_checked_marker() -> String {
    "checked".to_string()
}

impl Interaction {
    pub fn name(&self) -> &'static str {
        match self {
            Interaction::Click => "click",
            Interaction::ScriptClick => "script_click",
            Interaction::HoverClick { .. } => "hover_click",
            Interaction::Type { .. } => "type",
            Interaction::ReadAttribute { .. } => "read_attribute",
            Interaction::ReadText => "read_text",
            Interaction::ScrollIntoView => "scroll_into_view",
            Interaction::EnsureChecked { .. } => "ensure_checked",
            Interaction::Navigate { .. } => "navigate",
            Interaction::WaitOnly => "wait_only",
        }
    }

    /// Whether the interaction acts on a resolved element.
    pub fn needs_element(&self) -> bool {
        !matches!(self, Interaction::Navigate { .. })
    }

    /// Pointer interactions are preceded by scrolling the element into view.
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            Interaction::Click | Interaction::HoverClick { .. } | Interaction::EnsureChecked { .. }
        )
    }

    /// Element state the target must reach before the interaction runs.
    pub fn required_state(&self) -> ElementState {
        match self {
            Interaction::Click
            | Interaction::HoverClick { .. }
            | Interaction::EnsureChecked { .. }
            | Interaction::Type { .. } => ElementState::Clickable,
            Interaction::ReadText | Interaction::WaitOnly => ElementState::Visible,
            Interaction::ScriptClick
            | Interaction::ReadAttribute { .. }
            | Interaction::ScrollIntoView
            | Interaction::Navigate { .. } => ElementState::Present,
        }
    }
}

/// Report of one applied interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionReport {
    pub interaction: String,
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
    /// Value read by `read_attribute` / `read_text`
    pub value: Option<String>,
    /// `ensure_checked` found the element already checked and did nothing
    pub skipped: bool,
}

impl InteractionReport {
    pub fn new(interaction: &Interaction, started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            interaction: interaction.name().to_string(),
            started_at,
            latency_ms,
            value: None,
            skipped: false,
        }
    }

    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skipped = true;
        self
    }
}
