//! Read primitives - attribute values and visible text

use tracing::debug;
use webcycle_core_types::ElementHandle;
use webcycle_driver::BrowserDriver;

use crate::errors::ActionError;

pub async fn read_attribute(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
    name: &str,
) -> Result<Option<String>, ActionError> {
    let value = driver.attribute(element, name).await?;
    debug!(%element, name, found = value.is_some(), "attribute read");
    Ok(value)
}

pub async fn read_text(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
) -> Result<String, ActionError> {
    Ok(driver.text(element).await?.trim().to_string())
}
