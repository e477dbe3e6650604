//! Condition types for post-action validation

use std::fmt;

use action_primitives::Locator;
use serde::{Deserialize, Serialize};

/// Observable page condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Some strategy yields an element, displayed or not
    ElementPresent(Locator),

    /// Some strategy yields a displayed element
    ElementVisible(Locator),

    /// No strategy yields a displayed element (spinner gone, modal closed)
    ElementHidden(Locator),

    /// Current URL contains the fragment
    UrlContains(String),

    /// Attribute of the first present match contains `value`
    AttributeContains {
        locator: Locator,
        name: String,
        value: String,
    },

    /// Visible text of the first displayed match contains `text`
    TextContains { locator: Locator, text: String },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ElementPresent(locator) => write!(f, "present {}", locator),
            Condition::ElementVisible(locator) => write!(f, "visible {}", locator),
            Condition::ElementHidden(locator) => write!(f, "hidden {}", locator),
            Condition::UrlContains(fragment) => write!(f, "url contains '{}'", fragment),
            Condition::AttributeContains {
                locator,
                name,
                value,
            } => write!(f, "{} of {} contains '{}'", name, locator, value),
            Condition::TextContains { locator, text } => {
                write!(f, "text of {} contains '{}'", locator, text)
            }
        }
    }
}
