//! Action primitives implementation
//!
//! Interactions applied to an already-resolved element:
//! 1. click / script click / hover-then-click / ensure-checked
//! 2. type_text - Type text into input fields, optionally clearing first
//! 3. read - Read an attribute or the visible text
//! 4. scroll - Scroll element to the centre of the viewport
//! 5. navigate - Load a URL in the current window

mod click;
mod navigate;
mod read;
mod scroll;
mod type_text;

pub use click::*;
pub use navigate::*;
pub use read::*;
pub use scroll::*;
pub use type_text::*;

use chrono::Utc;
use tokio::time::Instant;
use tracing::debug;
use webcycle_core_types::ElementHandle;
use webcycle_driver::BrowserDriver;

use crate::{
    errors::ActionError,
    types::{Interaction, InteractionReport},
};

/// Default implementation of action primitives
#[derive(Clone, Debug)]
pub struct DefaultActionPrimitives {
    /// Scroll the target to the viewport centre before pointer interactions
    pub scroll_before_pointer: bool,
}

impl Default for DefaultActionPrimitives {
    fn default() -> Self {
        Self {
            scroll_before_pointer: true,
        }
    }
}

impl DefaultActionPrimitives {
    /// Apply `interaction`, on `element` when the interaction needs one.
    pub async fn apply(
        &self,
        driver: &dyn BrowserDriver,
        element: Option<&ElementHandle>,
        interaction: &Interaction,
    ) -> Result<InteractionReport, ActionError> {
        let started_at = Utc::now();
        let start = Instant::now();

        if let Interaction::Navigate { url } = interaction {
            execute_navigate(driver, url).await?;
            return Ok(InteractionReport::new(interaction, started_at, elapsed_ms(start)));
        }
        if matches!(interaction, Interaction::WaitOnly) {
            return Ok(InteractionReport::new(interaction, started_at, elapsed_ms(start)));
        }

        let element = element.ok_or_else(|| {
            ActionError::Invalid(format!("{} requires a target element", interaction.name()))
        })?;

        if self.scroll_before_pointer && interaction.is_pointer() {
            debug!(%element, "scrolling target into view");
            scroll_into_view(driver, element).await?;
        }

        let mut value = None;
        let mut skipped = false;
        match interaction {
            Interaction::Click => execute_click(driver, element).await?,
            Interaction::ScriptClick => execute_script_click(driver, element).await?,
            Interaction::HoverClick { pause_ms } => {
                execute_hover_click(driver, element, *pause_ms).await?
            }
            Interaction::Type { text, clear } => {
                execute_type_text(driver, element, text, *clear).await?
            }
            Interaction::ReadAttribute { name } => {
                value = read_attribute(driver, element, name).await?;
            }
            Interaction::ReadText => value = Some(read_text(driver, element).await?),
            Interaction::ScrollIntoView => scroll_into_view(driver, element).await?,
            Interaction::EnsureChecked { attribute, marker } => {
                skipped = !ensure_checked(driver, element, attribute, marker).await?;
            }
            Interaction::Navigate { .. } | Interaction::WaitOnly => {}
        }

        let report = InteractionReport::new(interaction, started_at, elapsed_ms(start))
            .with_value(value);
        Ok(if skipped { report.skipped() } else { report })
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
