//! Browser driver capability for the webcycle engine
//!
//! The engine never talks to a browser directly. Everything it needs is
//! expressed by [`BrowserDriver`]:
//! - element query and interaction (click, key input, attributes)
//! - script execution with element arguments
//! - window enumeration and switching
//! - frame switching relative to the current document
//!
//! Two implementations ship with the crate: [`FakeDriver`], an in-memory
//! scripted document model used by tests across the workspace, and
//! `WebDriverSession` (feature `webdriver`), backed by a W3C WebDriver server.

pub mod error;
pub mod fake;
#[cfg(feature = "webdriver")]
pub mod webdriver;

pub use error::*;
pub use fake::{ClickEffect, DocumentId, DriverCall, FakeDriver, FakeElement};
#[cfg(feature = "webdriver")]
pub use webdriver::{WebDriverOptions, WebDriverSession};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use webcycle_core_types::{By, ElementHandle, WindowHandle};

/// Argument passed to [`BrowserDriver::execute_script`], available to the
/// script as `arguments[i]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ScriptArg {
    Element(ElementHandle),
    Value(serde_json::Value),
}

/// Driver capability consumed by every engine layer.
///
/// All element operations are scoped to the document the driver currently
/// addresses; a handle obtained in another frame reports
/// [`DriverErrorKind::StaleElement`].
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load a URL in the current window.
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Query all elements matching one strategy in the current document.
    async fn find_all(&self, by: &By) -> DriverResult<Vec<ElementHandle>>;

    async fn click(&self, element: &ElementHandle) -> DriverResult<()>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()>;

    async fn clear(&self, element: &ElementHandle) -> DriverResult<()>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>>;

    async fn text(&self, element: &ElementHandle) -> DriverResult<String>;

    async fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool>;

    async fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool>;

    async fn execute_script(
        &self,
        script: &str,
        args: Vec<ScriptArg>,
    ) -> DriverResult<serde_json::Value>;

    /// Handles of all open top-level windows, in opening order.
    async fn window_handles(&self) -> DriverResult<Vec<WindowHandle>>;

    async fn current_window(&self) -> DriverResult<WindowHandle>;

    async fn switch_to_window(&self, handle: &WindowHandle) -> DriverResult<()>;

    /// Descend into the frame hosted by `element` in the current document.
    async fn switch_to_frame(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Return to the top-level document of the current window.
    async fn switch_to_default_content(&self) -> DriverResult<()>;

    async fn current_url(&self) -> DriverResult<String>;

    /// End the session. Later calls report [`DriverErrorKind::SessionLost`].
    async fn close(&self) -> DriverResult<()>;
}
