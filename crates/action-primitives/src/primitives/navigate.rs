//! Navigate primitive - Load a URL in the current window

use tracing::info;
use webcycle_driver::BrowserDriver;

use crate::errors::ActionError;

pub async fn execute_navigate(driver: &dyn BrowserDriver, url: &str) -> Result<(), ActionError> {
    if url.trim().is_empty() {
        return Err(ActionError::Invalid("navigation URL is empty".to_string()));
    }
    info!(url, "Executing navigate primitive");
    driver.navigate(url).await?;
    Ok(())
}
