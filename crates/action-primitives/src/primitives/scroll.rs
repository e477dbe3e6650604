//! Scroll primitive - bring an element to the vertical centre of the viewport

use webcycle_core_types::ElementHandle;
use webcycle_driver::{BrowserDriver, ScriptArg};

use crate::errors::ActionError;

const CENTER_SCRIPT: &str = r#"
const el = arguments[0];
const viewport = Math.max(document.documentElement.clientHeight, window.innerHeight || 0);
const top = el.getBoundingClientRect().top;
window.scrollBy(0, top - viewport / 2);
"#;

pub async fn scroll_into_view(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
) -> Result<(), ActionError> {
    driver
        .execute_script(CENTER_SCRIPT, vec![ScriptArg::Element(element.clone())])
        .await?;
    Ok(())
}
