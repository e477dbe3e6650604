//! Type text primitive - Type text into input fields

use tracing::{debug, info};
use webcycle_core_types::ElementHandle;
use webcycle_driver::BrowserDriver;

use crate::errors::ActionError;

/// Type `text` into `element`, clearing existing content first when asked.
///
/// The text itself is never logged; only its length is.
pub async fn execute_type_text(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
    text: &str,
    clear: bool,
) -> Result<(), ActionError> {
    info!(%element, text_length = text.chars().count(), clear, "Executing type_text primitive");

    if clear {
        debug!(%element, "clearing existing content");
        driver.clear(element).await?;
    }
    if text.is_empty() {
        return Ok(());
    }
    driver.send_keys(element, text).await?;
    Ok(())
}
