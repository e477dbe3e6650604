use std::sync::Arc;

use action_locator::{DefaultElementResolver, ElementResolver};
use action_primitives::{poll_until, wait_for_ready_state, ActionError, ElementState, Locator};
use tracing::{debug, info, warn};
use webcycle_core_types::WindowHandle;
use webcycle_driver::{BrowserDriver, DriverError};

use crate::{
    errors::ContextError,
    types::{
        ContextDiagnostics, ContextRequirement, ContextSettings, ContextState, ExecutionContext,
        WindowTarget,
    },
};

/// Owns the driver handle and every window/frame transition.
pub struct ContextManager {
    driver: Arc<dyn BrowserDriver>,
    resolver: Arc<dyn ElementResolver>,
    settings: ContextSettings,
    context: ExecutionContext,
    state: ContextState,
}

impl ContextManager {
    pub fn new(driver: Arc<dyn BrowserDriver>, settings: ContextSettings) -> Self {
        Self::with_resolver(driver, Arc::new(DefaultElementResolver::new()), settings)
    }

    pub fn with_resolver(
        driver: Arc<dyn BrowserDriver>,
        resolver: Arc<dyn ElementResolver>,
        settings: ContextSettings,
    ) -> Self {
        Self {
            driver,
            resolver,
            settings,
            context: ExecutionContext::default(),
            state: ContextState::AtRoot,
        }
    }

    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    pub fn resolver(&self) -> &dyn ElementResolver {
        self.resolver.as_ref()
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    /// Record a failure observed outside the manager; missing window or
    /// frame reports move the state to `ContextLost`.
    pub fn observe_error(&mut self, err: &ActionError) {
        if matches!(err, ActionError::ContextLost(_)) {
            warn!(context = %self.context, error = %err, "context lost");
            self.state = ContextState::ContextLost;
        }
    }

    fn observe_driver_error(&mut self, err: &DriverError) {
        if err.is_context_loss() {
            self.state = ContextState::ContextLost;
        }
    }

    /// Switch to the top-level document of the current window.
    pub async fn reset_to_root(&mut self) -> Result<(), ContextError> {
        if let Err(err) = self.driver.switch_to_default_content().await {
            self.observe_driver_error(&err);
            return Err(ContextError::at_segment(None, err.into()));
        }
        self.context.frame_path.clear();
        self.state = ContextState::AtRoot;
        Ok(())
    }

    /// Reset to root, wait for the root anchor, then descend through `path`.
    ///
    /// A failed segment leaves the manager reset to root.
    pub async fn enter(&mut self, path: &[Locator]) -> Result<(), ContextError> {
        self.reset_to_root().await?;

        if let Some(anchor) = self.settings.root_anchor.clone() {
            if let Err(err) = self
                .resolver
                .resolve(
                    self.driver.as_ref(),
                    &anchor,
                    ElementState::Present,
                    &self.settings.anchor_wait,
                )
                .await
            {
                return Err(ContextError::locating(None, err));
            }
        }

        for (index, segment) in path.iter().enumerate() {
            if let Err(err) = self.descend(index, segment).await {
                warn!(segment = index, frame = %segment, error = %err, "frame descent failed");
                self.abandon_descent().await?;
                return Err(err);
            }
        }

        if self.settings.await_ready_state && !path.is_empty() {
            if let Err(err) =
                wait_for_ready_state(self.driver.as_ref(), &self.settings.frame_wait).await
            {
                self.abandon_descent().await?;
                return Err(ContextError::at_segment(Some(path.len() - 1), err));
            }
        }

        self.context.frame_path = path.to_vec();
        self.state = if path.is_empty() {
            ContextState::AtRoot
        } else {
            ContextState::InFrame(path.to_vec())
        };
        debug!(context = %self.context, "context entered");
        Ok(())
    }

    async fn descend(&mut self, index: usize, segment: &Locator) -> Result<(), ContextError> {
        let resolved = self
            .resolver
            .resolve(
                self.driver.as_ref(),
                segment,
                ElementState::Present,
                &self.settings.frame_wait,
            )
            .await
            .map_err(|err| ContextError::locating(Some(index), err))?;

        if let Err(err) = self.driver.switch_to_frame(&resolved.element).await {
            self.observe_driver_error(&err);
            return Err(ContextError::at_segment(Some(index), err.into()));
        }
        debug!(segment = index, strategy = %resolved.strategy, "entered frame");
        Ok(())
    }

    /// Return to root after a partial descent; only session loss escapes.
    async fn abandon_descent(&mut self) -> Result<(), ContextError> {
        match self.reset_to_root().await {
            Err(err) if err.is_session_lost() => Err(err),
            _ => Ok(()),
        }
    }

    /// `enter`, with one reset-and-retry before escalating to
    /// `Unrecoverable`.
    pub async fn enter_with_recovery(&mut self, path: &[Locator]) -> Result<(), ContextError> {
        match self.enter(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_session_lost() => Err(err),
            Err(first) => {
                info!(error = %first, "re-establishing context after reset");
                match self.enter(path).await {
                    Ok(()) => Ok(()),
                    Err(err) if err.is_session_lost() => Err(err),
                    Err(second) => {
                        self.state = ContextState::ContextLost;
                        Err(ContextError::Unrecoverable(Box::new(second)))
                    }
                }
            }
        }
    }

    /// Switch windows when required, then enter the frame path.
    pub async fn establish(&mut self, requirement: &ContextRequirement) -> Result<(), ContextError> {
        if let Some(target) = &requirement.window {
            self.switch_window(target).await?;
        }
        self.enter(&requirement.frames).await
    }

    /// `establish`, where the window switch and the frame descent each get
    /// one reset-and-retry before escalating to `Unrecoverable`.
    pub async fn establish_with_recovery(
        &mut self,
        requirement: &ContextRequirement,
    ) -> Result<(), ContextError> {
        if let Some(target) = &requirement.window {
            self.switch_window_with_recovery(target).await?;
        }
        self.enter_with_recovery(&requirement.frames).await
    }

    async fn switch_window_with_recovery(
        &mut self,
        target: &WindowTarget,
    ) -> Result<WindowHandle, ContextError> {
        match self.switch_window(target).await {
            Ok(handle) => Ok(handle),
            Err(err) if err.is_session_lost() => Err(err),
            Err(first) => {
                info!(window = %target, error = %first, "retrying window switch after reset");
                self.abandon_descent().await?;
                match self.switch_window(target).await {
                    Ok(handle) => Ok(handle),
                    Err(err) if err.is_session_lost() => Err(err),
                    Err(second) => {
                        self.state = ContextState::ContextLost;
                        Err(ContextError::Unrecoverable(Box::new(second)))
                    }
                }
            }
        }
    }

    pub async fn window_handles(&self) -> Result<Vec<WindowHandle>, ContextError> {
        self.driver
            .window_handles()
            .await
            .map_err(|err| ContextError::at_segment(None, err.into()))
    }

    pub async fn window_count(&self) -> Result<usize, ContextError> {
        Ok(self.window_handles().await?.len())
    }

    /// Poll the window list until `target` exists, then switch to it.
    /// The frame path resets with the switch.
    pub async fn switch_window(&mut self, target: &WindowTarget) -> Result<WindowHandle, ContextError> {
        let driver = self.driver.as_ref();
        let wait = self.settings.window_wait;
        let what = format!("window {}", target);
        let found = poll_until(&wait, &what, || async move {
            let handles = driver.window_handles().await?;
            Ok(match target {
                WindowTarget::Handle(handle) => handles.iter().find(|h| *h == handle).cloned(),
                WindowTarget::Index(index) => handles.get(*index).cloned(),
                WindowTarget::Newest => handles.last().cloned(),
            })
        })
        .await;

        let handle = match found {
            Ok(handle) => handle,
            Err(ActionError::WaitTimeout(_)) => {
                return Err(ContextError::WindowNotFound {
                    target: target.to_string(),
                    timeout_ms: wait.timeout_ms,
                })
            }
            Err(err) => return Err(ContextError::at_segment(None, err)),
        };

        if let Err(err) = self.driver.switch_to_window(&handle).await {
            self.observe_driver_error(&err);
            return Err(match err.kind {
                webcycle_driver::DriverErrorKind::NoSuchWindow => ContextError::WindowNotFound {
                    target: target.to_string(),
                    timeout_ms: wait.timeout_ms,
                },
                _ => ContextError::at_segment(None, err.into()),
            });
        }

        info!(window = %handle, "switched window");
        self.context.window = Some(handle.clone());
        self.context.frame_path.clear();
        self.state = ContextState::AtRoot;
        Ok(handle)
    }

    /// Best-effort snapshot for failure reports; never fails.
    pub async fn diagnostics(&self) -> ContextDiagnostics {
        let url = self.driver.current_url().await.ok();
        let window_handles = self.driver.window_handles().await.unwrap_or_default();
        let current_window = match self.driver.current_window().await {
            Ok(handle) => Some(handle),
            Err(_) => self.context.window.clone(),
        };
        ContextDiagnostics {
            url,
            window_count: window_handles.len(),
            window_handles,
            current_window,
            frame_depth: self.context.frame_path.len(),
            state: self.state.name().to_string(),
        }
    }
}
