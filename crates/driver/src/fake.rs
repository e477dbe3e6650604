//! In-memory scripted driver
//!
//! Models windows, documents and frames closely enough to exercise the
//! engine's context handling without a browser: elements can appear late,
//! refuse native clicks, host frames, and trigger effects (open a window,
//! toggle visibility, flip an attribute) when clicked. Every call is recorded
//! so tests can assert on the exact driver traffic.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::time::Instant;
use tracing::debug;
use webcycle_core_types::{By, ElementHandle, WindowHandle};

use crate::error::{DriverError, DriverErrorKind, DriverResult};
use crate::{BrowserDriver, ScriptArg};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DocumentId(pub usize);

/// Side effect applied when an element is clicked (natively or by script).
#[derive(Clone, Debug)]
pub enum ClickEffect {
    /// Open a new top-level window showing `document`, visible to
    /// `window_handles` only after `delay`.
    OpenWindow {
        document: DocumentId,
        url: String,
        delay: Duration,
    },
    SetAttribute {
        element: ElementHandle,
        name: String,
        value: String,
    },
    SetDisplayed {
        element: ElementHandle,
        displayed: bool,
    },
    Navigate {
        url: String,
    },
}

#[derive(Clone, Debug)]
pub struct FakeElement {
    handle: ElementHandle,
    selectors: Vec<By>,
    displayed: bool,
    enabled: bool,
    text: String,
    attributes: HashMap<String, String>,
    frame: Option<DocumentId>,
    appear_delay: Option<Duration>,
    appears_at: Option<Instant>,
    click_failures: u32,
    on_click: Vec<ClickEffect>,
}

impl FakeElement {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: ElementHandle::new(handle),
            selectors: Vec::new(),
            displayed: true,
            enabled: true,
            text: String::new(),
            attributes: HashMap::new(),
            frame: None,
            appear_delay: None,
            appears_at: None,
            click_failures: 0,
            on_click: Vec::new(),
        }
    }

    pub fn matching(mut self, by: By) -> Self {
        self.selectors.push(by);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Make this element an iframe hosting `document`.
    pub fn hosting(mut self, document: DocumentId) -> Self {
        self.frame = Some(document);
        self
    }

    /// The element only becomes queryable `delay` after it is added.
    pub fn appearing_after(mut self, delay: Duration) -> Self {
        self.appear_delay = Some(delay);
        self
    }

    /// The first `count` native clicks fail as not interactable.
    pub fn failing_clicks(mut self, count: u32) -> Self {
        self.click_failures = count;
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    pub fn handle(&self) -> &ElementHandle {
        &self.handle
    }

    fn is_present(&self, now: Instant) -> bool {
        self.appears_at.map_or(true, |at| now >= at)
    }
}

/// One recorded driver call.
#[derive(Clone, Debug, PartialEq)]
pub enum DriverCall {
    Navigate(String),
    FindAll(By),
    Click(ElementHandle),
    SendKeys(ElementHandle, String),
    Clear(ElementHandle),
    Script(String),
    WindowHandles,
    SwitchToWindow(WindowHandle),
    SwitchToFrame(ElementHandle),
    SwitchToDefault,
    CurrentUrl,
}

#[derive(Debug)]
struct FakeWindow {
    handle: WindowHandle,
    document: DocumentId,
    url: String,
    opens_at: Instant,
    closed: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    documents: Vec<Vec<FakeElement>>,
    detached: HashSet<DocumentId>,
    windows: Vec<FakeWindow>,
    current_window: usize,
    frame_stack: Vec<DocumentId>,
    lost: bool,
    rejected: HashMap<By, DriverErrorKind>,
    calls: Vec<DriverCall>,
}

impl FakeState {
    fn ensure_session(&self) -> DriverResult<()> {
        if self.lost {
            return Err(DriverError::session_lost("fake session closed"));
        }
        Ok(())
    }

    fn ensure_window(&self) -> DriverResult<&FakeWindow> {
        self.ensure_session()?;
        let window = &self.windows[self.current_window];
        if window.closed {
            return Err(DriverError::new(DriverErrorKind::NoSuchWindow)
                .with_hint(format!("window {} was closed", window.handle)));
        }
        Ok(window)
    }

    fn current_document(&self) -> DriverResult<DocumentId> {
        let window = self.ensure_window()?;
        let doc = self.frame_stack.last().copied().unwrap_or(window.document);
        if self.detached.contains(&doc) {
            return Err(DriverError::new(DriverErrorKind::NoSuchFrame)
                .with_hint("current frame was detached"));
        }
        Ok(doc)
    }

    fn element_in_current(&self, handle: &ElementHandle) -> DriverResult<(DocumentId, usize)> {
        let doc = self.current_document()?;
        let now = Instant::now();
        self.documents[doc.0]
            .iter()
            .position(|el| &el.handle == handle && el.is_present(now))
            .map(|idx| (doc, idx))
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::StaleElement)
                    .with_hint(format!("{} is not attached to the current document", handle))
            })
    }

    fn element_anywhere_mut(&mut self, handle: &ElementHandle) -> Option<&mut FakeElement> {
        self.documents
            .iter_mut()
            .flat_map(|doc| doc.iter_mut())
            .find(|el| &el.handle == handle)
    }

    fn visible_windows(&self, now: Instant) -> impl Iterator<Item = &FakeWindow> {
        self.windows
            .iter()
            .filter(move |w| !w.closed && now >= w.opens_at)
    }

    fn apply_effects(&mut self, effects: Vec<ClickEffect>) {
        let now = Instant::now();
        for effect in effects {
            match effect {
                ClickEffect::OpenWindow {
                    document,
                    url,
                    delay,
                } => {
                    let handle = WindowHandle::new(format!("window-{}", self.windows.len() + 1));
                    debug!(%handle, delay_ms = delay.as_millis() as u64, "fake window scheduled");
                    self.windows.push(FakeWindow {
                        handle,
                        document,
                        url,
                        opens_at: now + delay,
                        closed: false,
                    });
                }
                ClickEffect::SetAttribute {
                    element,
                    name,
                    value,
                } => {
                    if let Some(el) = self.element_anywhere_mut(&element) {
                        el.attributes.insert(name, value);
                    }
                }
                ClickEffect::SetDisplayed { element, displayed } => {
                    if let Some(el) = self.element_anywhere_mut(&element) {
                        el.displayed = displayed;
                    }
                }
                ClickEffect::Navigate { url } => {
                    let idx = self.current_window;
                    self.windows[idx].url = url;
                }
            }
        }
    }
}

/// Scripted in-memory [`BrowserDriver`].
pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    /// A session with one window whose top-level document is [`FakeDriver::root`].
    pub fn new(url: impl Into<String>) -> Self {
        let state = FakeState {
            documents: vec![Vec::new()],
            windows: vec![FakeWindow {
                handle: WindowHandle::new("window-1"),
                document: DocumentId(0),
                url: url.into(),
                opens_at: Instant::now(),
                closed: false,
            }],
            ..FakeState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn root(&self) -> DocumentId {
        DocumentId(0)
    }

    pub fn add_document(&self) -> DocumentId {
        let mut state = self.state.lock();
        state.documents.push(Vec::new());
        DocumentId(state.documents.len() - 1)
    }

    pub fn add_element(&self, document: DocumentId, mut element: FakeElement) -> ElementHandle {
        if let Some(delay) = element.appear_delay {
            element.appears_at = Some(Instant::now() + delay);
        }
        let handle = element.handle.clone();
        self.state.lock().documents[document.0].push(element);
        handle
    }

    /// Remove an element; a frame it hosted becomes detached.
    pub fn remove_element(&self, handle: &ElementHandle) {
        let mut state = self.state.lock();
        let mut detached = Vec::new();
        for doc in state.documents.iter_mut() {
            doc.retain(|el| {
                if &el.handle == handle {
                    if let Some(frame) = el.frame {
                        detached.push(frame);
                    }
                    false
                } else {
                    true
                }
            });
        }
        state.detached.extend(detached);
    }

    pub fn set_displayed(&self, handle: &ElementHandle, displayed: bool) {
        if let Some(el) = self.state.lock().element_anywhere_mut(handle) {
            el.displayed = displayed;
        }
    }

    pub fn attribute_of(&self, handle: &ElementHandle, name: &str) -> Option<String> {
        let mut state = self.state.lock();
        state
            .element_anywhere_mut(handle)
            .and_then(|el| el.attributes.get(name).cloned())
    }

    /// Make every query with `by` fail with `kind`, as a browser does for a
    /// malformed selector.
    pub fn reject_strategy(&self, by: By, kind: DriverErrorKind) {
        self.state.lock().rejected.insert(by, kind);
    }

    /// Simulate the browser going away.
    pub fn lose_session(&self) {
        self.state.lock().lost = true;
    }

    pub fn close_window(&self, handle: &WindowHandle) {
        let mut state = self.state.lock();
        if let Some(window) = state.windows.iter_mut().find(|w| &w.handle == handle) {
            window.closed = true;
        }
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn default_content_switches(&self) -> usize {
        self.count_calls(|c| matches!(c, DriverCall::SwitchToDefault))
    }

    pub fn clicks_on(&self, handle: &ElementHandle) -> usize {
        self.count_calls(|c| matches!(c, DriverCall::Click(h) if h == handle))
    }

    pub fn scripts_run(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                DriverCall::Script(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Depth of the frame stack in the current window.
    pub fn frame_depth(&self) -> usize {
        self.state.lock().frame_stack.len()
    }

    fn record(&self, call: DriverCall) {
        self.state.lock().calls.push(call);
    }

    fn activate(&self, handle: &ElementHandle, native: bool) -> DriverResult<()> {
        let mut state = self.state.lock();
        let (doc, idx) = state.element_in_current(handle)?;
        let element = &mut state.documents[doc.0][idx];
        if native {
            if !element.displayed || !element.enabled {
                return Err(DriverError::new(DriverErrorKind::NotInteractable)
                    .with_hint(format!("{} is hidden or disabled", handle)));
            }
            if element.click_failures > 0 {
                element.click_failures -= 1;
                return Err(DriverError::new(DriverErrorKind::NotInteractable)
                    .with_hint(format!("{} is obscured", handle)));
            }
        }
        let effects = element.on_click.clone();
        state.apply_effects(effects);
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.record(DriverCall::Navigate(url.to_string()));
        let mut state = self.state.lock();
        state.ensure_window()?;
        let idx = state.current_window;
        state.windows[idx].url = url.to_string();
        state.frame_stack.clear();
        Ok(())
    }

    async fn find_all(&self, by: &By) -> DriverResult<Vec<ElementHandle>> {
        self.record(DriverCall::FindAll(by.clone()));
        let state = self.state.lock();
        let doc = state.current_document()?;
        if let Some(kind) = state.rejected.get(by) {
            return Err(DriverError::new(*kind).with_hint(format!("invalid selector {}", by)));
        }
        let now = Instant::now();
        Ok(state.documents[doc.0]
            .iter()
            .filter(|el| el.is_present(now) && el.selectors.contains(by))
            .map(|el| el.handle.clone())
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        self.record(DriverCall::Click(element.clone()));
        self.activate(element, true)
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        self.record(DriverCall::SendKeys(element.clone(), text.to_string()));
        let mut state = self.state.lock();
        let (doc, idx) = state.element_in_current(element)?;
        let el = &mut state.documents[doc.0][idx];
        if !el.displayed || !el.enabled {
            return Err(DriverError::new(DriverErrorKind::NotInteractable)
                .with_hint(format!("{} does not accept input", element)));
        }
        el.attributes
            .entry("value".to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        self.record(DriverCall::Clear(element.clone()));
        let mut state = self.state.lock();
        let (doc, idx) = state.element_in_current(element)?;
        state.documents[doc.0][idx]
            .attributes
            .insert("value".to_string(), String::new());
        Ok(())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let state = self.state.lock();
        let (doc, idx) = state.element_in_current(element)?;
        Ok(state.documents[doc.0][idx].attributes.get(name).cloned())
    }

    async fn text(&self, element: &ElementHandle) -> DriverResult<String> {
        let state = self.state.lock();
        let (doc, idx) = state.element_in_current(element)?;
        Ok(state.documents[doc.0][idx].text.clone())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool> {
        let state = self.state.lock();
        let (doc, idx) = state.element_in_current(element)?;
        Ok(state.documents[doc.0][idx].displayed)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool> {
        let state = self.state.lock();
        let (doc, idx) = state.element_in_current(element)?;
        Ok(state.documents[doc.0][idx].enabled)
    }

    async fn execute_script(
        &self,
        script: &str,
        args: Vec<ScriptArg>,
    ) -> DriverResult<serde_json::Value> {
        self.record(DriverCall::Script(script.to_string()));
        self.state.lock().current_document()?;
        if script.contains("readyState") {
            return Ok(json!("complete"));
        }
        if script.contains(".click()") {
            if let Some(ScriptArg::Element(handle)) = args.first() {
                self.activate(handle, false)?;
            }
        }
        Ok(serde_json::Value::Null)
    }

    async fn window_handles(&self) -> DriverResult<Vec<WindowHandle>> {
        self.record(DriverCall::WindowHandles);
        let state = self.state.lock();
        state.ensure_session()?;
        let now = Instant::now();
        Ok(state.visible_windows(now).map(|w| w.handle.clone()).collect())
    }

    async fn current_window(&self) -> DriverResult<WindowHandle> {
        let state = self.state.lock();
        Ok(state.ensure_window()?.handle.clone())
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> DriverResult<()> {
        self.record(DriverCall::SwitchToWindow(handle.clone()));
        let mut state = self.state.lock();
        state.ensure_session()?;
        let now = Instant::now();
        let idx = state
            .windows
            .iter()
            .position(|w| &w.handle == handle && !w.closed && now >= w.opens_at)
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::NoSuchWindow).with_hint(handle.to_string())
            })?;
        state.current_window = idx;
        state.frame_stack.clear();
        Ok(())
    }

    async fn switch_to_frame(&self, element: &ElementHandle) -> DriverResult<()> {
        self.record(DriverCall::SwitchToFrame(element.clone()));
        let mut state = self.state.lock();
        let (doc, idx) = state.element_in_current(element)?;
        let frame = state.documents[doc.0][idx].frame.ok_or_else(|| {
            DriverError::new(DriverErrorKind::NoSuchFrame)
                .with_hint(format!("{} does not host a frame", element))
        })?;
        state.frame_stack.push(frame);
        Ok(())
    }

    async fn switch_to_default_content(&self) -> DriverResult<()> {
        self.record(DriverCall::SwitchToDefault);
        let mut state = self.state.lock();
        state.ensure_window()?;
        state.frame_stack.clear();
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.record(DriverCall::CurrentUrl);
        let state = self.state.lock();
        Ok(state.ensure_window()?.url.clone())
    }

    async fn close(&self) -> DriverResult<()> {
        self.state.lock().lost = true;
        Ok(())
    }
}
