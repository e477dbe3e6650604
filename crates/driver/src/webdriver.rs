//! W3C WebDriver backed driver (chromedriver, geckodriver, selenium grid).

use async_trait::async_trait;
use fantoccini::elements::{Element, ElementRef};
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, ClientBuilder, Locator};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use webcycle_core_types::{By, ElementHandle, WindowHandle};

use crate::error::{DriverError, DriverErrorKind, DriverResult};
use crate::{BrowserDriver, ScriptArg};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebDriverOptions {
    /// WebDriver server endpoint, e.g. `http://localhost:9515`.
    pub url: String,
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub window_size: Option<(u32, u32)>,
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            headless: false,
            window_size: None,
        }
    }
}

pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    pub async fn connect(options: &WebDriverOptions) -> DriverResult<Self> {
        let mut caps = serde_json::Map::new();
        let mut args = vec!["--no-sandbox".to_string(), "--disable-dev-shm-usage".to_string()];
        if options.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
        }
        if let Some((w, h)) = options.window_size {
            args.push(format!("--window-size={},{}", w, h));
        }
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        debug!(url = %options.url, headless = options.headless, "connecting to webdriver");
        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(&options.url)
            .await
            .map_err(|err| {
                DriverError::new(DriverErrorKind::SessionLost)
                    .with_hint(format!("cannot open session at {}: {}", options.url, err))
            })?;

        if let Some((w, h)) = options.window_size {
            if let Err(err) = client.set_window_size(w, h).await {
                warn!(error = %err, "could not resize window");
            }
        }
        info!(url = %options.url, "webdriver session established");
        Ok(Self { client })
    }

    fn element(&self, handle: &ElementHandle) -> Element {
        Element::from_element_id(self.client.clone(), ElementRef::from(handle.0.clone()))
    }
}

fn locator_for(by: &By) -> (String, bool) {
    match by {
        By::XPath(v) => (v.clone(), true),
        By::LinkText(v) => (v.clone(), false),
        other => (other.to_css().unwrap_or_default(), false),
    }
}

fn map_err(err: CmdError) -> DriverError {
    let hint = err.to_string();
    let kind = match &err {
        CmdError::Standard(wd) => match wd.error {
            ErrorStatus::NoSuchElement => DriverErrorKind::NoSuchElement,
            ErrorStatus::StaleElementReference => DriverErrorKind::StaleElement,
            ErrorStatus::ElementNotInteractable
            | ErrorStatus::ElementClickIntercepted
            | ErrorStatus::InvalidElementState => DriverErrorKind::NotInteractable,
            ErrorStatus::NoSuchFrame => DriverErrorKind::NoSuchFrame,
            ErrorStatus::NoSuchWindow => DriverErrorKind::NoSuchWindow,
            ErrorStatus::InvalidSessionId | ErrorStatus::SessionNotCreated => {
                DriverErrorKind::SessionLost
            }
            ErrorStatus::JavascriptError => DriverErrorKind::Script,
            ErrorStatus::Timeout | ErrorStatus::ScriptTimeout => DriverErrorKind::Timeout,
            _ => DriverErrorKind::Internal,
        },
        CmdError::Lost(_) => DriverErrorKind::SessionLost,
        _ => DriverErrorKind::Internal,
    };
    DriverError::new(kind).with_hint(hint)
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.client.goto(url).await.map_err(map_err)
    }

    async fn find_all(&self, by: &By) -> DriverResult<Vec<ElementHandle>> {
        let (selector, xpath) = locator_for(by);
        let locator = match by {
            By::LinkText(_) => Locator::LinkText(&selector),
            _ if xpath => Locator::XPath(&selector),
            _ => Locator::Css(&selector),
        };
        let found = self.client.find_all(locator).await.map_err(map_err)?;
        Ok(found
            .iter()
            .map(|el| ElementHandle::new(el.element_id().to_string()))
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        self.element(element).click().await.map_err(map_err)
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        self.element(element).send_keys(text).await.map_err(map_err)
    }

    async fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        self.element(element).clear().await.map_err(map_err)
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        self.element(element).attr(name).await.map_err(map_err)
    }

    async fn text(&self, element: &ElementHandle) -> DriverResult<String> {
        self.element(element).text().await.map_err(map_err)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.element(element).is_displayed().await.map_err(map_err)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.element(element).is_enabled().await.map_err(map_err)
    }

    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> DriverResult<Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(match arg {
                ScriptArg::Element(handle) => serde_json::to_value(self.element(&handle))
                    .map_err(|err| {
                        DriverError::new(DriverErrorKind::Internal).with_hint(err.to_string())
                    })?,
                ScriptArg::Value(value) => value,
            });
        }
        self.client.execute(script, values).await.map_err(map_err)
    }

    async fn window_handles(&self) -> DriverResult<Vec<WindowHandle>> {
        let windows = self.client.windows().await.map_err(map_err)?;
        Ok(windows
            .into_iter()
            .map(|w| WindowHandle::new(String::from(w)))
            .collect())
    }

    async fn current_window(&self) -> DriverResult<WindowHandle> {
        let window = self.client.window().await.map_err(map_err)?;
        Ok(WindowHandle::new(String::from(window)))
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> DriverResult<()> {
        let target = fantoccini::wd::WindowHandle::try_from(handle.0.clone()).map_err(|err| {
            DriverError::new(DriverErrorKind::NoSuchWindow).with_hint(err.to_string())
        })?;
        self.client.switch_to_window(target).await.map_err(map_err)
    }

    async fn switch_to_frame(&self, element: &ElementHandle) -> DriverResult<()> {
        self.element(element)
            .enter_frame()
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn switch_to_default_content(&self) -> DriverResult<()> {
        self.client.enter_frame(None).await.map_err(map_err)
    }

    async fn current_url(&self) -> DriverResult<String> {
        let url = self.client.current_url().await.map_err(map_err)?;
        Ok(url.to_string())
    }

    async fn close(&self) -> DriverResult<()> {
        self.client.clone().close().await.map_err(map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locators_map_onto_webdriver_strategies() {
        assert_eq!(
            locator_for(&By::Id("iTalentFrame".into())),
            ("[id=\"iTalentFrame\"]".to_string(), false)
        );
        assert_eq!(
            locator_for(&By::XPath("//iframe".into())),
            ("//iframe".to_string(), true)
        );
    }
}
