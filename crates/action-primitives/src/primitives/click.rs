//! Click primitives - native, script, hover-then-click and ensure-checked

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};
use webcycle_core_types::ElementHandle;
use webcycle_driver::{BrowserDriver, ScriptArg};

use crate::errors::ActionError;

const SCRIPT_CLICK: &str = "arguments[0].click();";

const HOVER_SCRIPT: &str = r#"
const el = arguments[0];
for (const type of ['mouseover', 'mouseenter', 'mousemove']) {
    el.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window }));
}
"#;

/// Native click through the driver.
pub async fn execute_click(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
) -> Result<(), ActionError> {
    debug!(%element, "native click");
    driver.click(element).await?;
    Ok(())
}

/// Click dispatched from page script; reaches elements that are covered by
/// overlays or report as not interactable.
pub async fn execute_script_click(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
) -> Result<(), ActionError> {
    debug!(%element, "script click");
    driver
        .execute_script(SCRIPT_CLICK, vec![ScriptArg::Element(element.clone())])
        .await?;
    Ok(())
}

/// Move the pointer onto the element, pause, then click natively.
pub async fn execute_hover_click(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
    pause_ms: u64,
) -> Result<(), ActionError> {
    driver
        .execute_script(HOVER_SCRIPT, vec![ScriptArg::Element(element.clone())])
        .await?;
    sleep(Duration::from_millis(pause_ms)).await;
    execute_click(driver, element).await
}

/// Click only when `attribute` does not already contain `marker`.
///
/// Returns whether a click was made.
pub async fn ensure_checked(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
    attribute: &str,
    marker: &str,
) -> Result<bool, ActionError> {
    let current = driver.attribute(element, attribute).await?;
    if current.as_deref().is_some_and(|value| value.contains(marker)) {
        info!(%element, attribute, "already checked, leaving as is");
        return Ok(false);
    }
    execute_click(driver, element).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcycle_driver::{FakeDriver, FakeElement};

    #[tokio::test(start_paused = true)]
    async fn hover_click_pauses_before_clicking() {
        let driver = FakeDriver::new("https://example.test/");
        let nav = driver.add_element(driver.root(), FakeElement::new("nav"));
        let start = tokio::time::Instant::now();

        execute_hover_click(&driver, &nav, 300).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(driver.clicks_on(&nav), 1);
        assert!(driver.scripts_run()[0].contains("mouseover"));
    }

    #[tokio::test]
    async fn script_click_reaches_obscured_elements() {
        let driver = FakeDriver::new("https://example.test/");
        let obscured = driver.add_element(driver.root(), FakeElement::new("o").failing_clicks(5));

        assert!(matches!(
            execute_click(&driver, &obscured).await,
            Err(ActionError::NotClickable(_))
        ));
        execute_script_click(&driver, &obscured).await.unwrap();
    }
}
