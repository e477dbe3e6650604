use std::fmt;

use action_primitives::{Locator, WaitOptions};
use serde::{Deserialize, Serialize};
use webcycle_core_types::WindowHandle;

/// Where the driver is addressed right now.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub window: Option<WindowHandle>,
    pub frame_path: Vec<Locator>,
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.window {
            Some(window) => write!(f, "window={}", window)?,
            None => f.write_str("window=<initial>")?,
        }
        write!(f, " frames={}", self.frame_path.len())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextState {
    AtRoot,
    InFrame(Vec<Locator>),
    /// The driver reported the addressed window or frame missing
    ContextLost,
}

impl ContextState {
    pub fn name(&self) -> &'static str {
        match self {
            ContextState::AtRoot => "at_root",
            ContextState::InFrame(_) => "in_frame",
            ContextState::ContextLost => "context_lost",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowTarget {
    Handle(WindowHandle),
    /// Position in the driver's window list, opening order
    Index(usize),
    Newest,
}

impl fmt::Display for WindowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowTarget::Handle(handle) => write!(f, "handle {}", handle),
            WindowTarget::Index(index) => write!(f, "index {}", index),
            WindowTarget::Newest => f.write_str("newest"),
        }
    }
}

/// Context a step needs before it resolves its element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRequirement {
    #[serde(default)]
    pub window: Option<WindowTarget>,
    /// Empty means the top-level document
    #[serde(default)]
    pub frames: Vec<Locator>,
}

impl ContextRequirement {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn frames(frames: Vec<Locator>) -> Self {
        Self {
            window: None,
            frames,
        }
    }

    pub fn in_window(mut self, target: WindowTarget) -> Self {
        self.window = Some(target);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Element that must exist in the top-level document before descending
    #[serde(default)]
    pub root_anchor: Option<Locator>,
    #[serde(default = "default_anchor_wait")]
    pub anchor_wait: WaitOptions,
    #[serde(default = "default_frame_wait")]
    pub frame_wait: WaitOptions,
    #[serde(default = "default_window_wait")]
    pub window_wait: WaitOptions,
    /// Wait for `document.readyState == "complete"` after entering a frame
    #[serde(default)]
    pub await_ready_state: bool,
}

fn default_anchor_wait() -> WaitOptions {
    WaitOptions::new(20_000, 250)
}

fn default_frame_wait() -> WaitOptions {
    WaitOptions::new(10_000, 250)
}

fn default_window_wait() -> WaitOptions {
    WaitOptions::new(10_000, 250)
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            root_anchor: None,
            anchor_wait: default_anchor_wait(),
            frame_wait: default_frame_wait(),
            window_wait: default_window_wait(),
            await_ready_state: false,
        }
    }
}

/// Snapshot attached to failure reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDiagnostics {
    pub url: Option<String>,
    pub window_handles: Vec<WindowHandle>,
    pub window_count: usize,
    pub current_window: Option<WindowHandle>,
    pub frame_depth: usize,
    pub state: String,
}

impl fmt::Display for ContextDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "url={} windows={} frame_depth={} state={}",
            self.url.as_deref().unwrap_or("<unknown>"),
            self.window_count,
            self.frame_depth,
            self.state
        )
    }
}
