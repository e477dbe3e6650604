//! Element resolver with per-tick fallback across strategies

use action_primitives::{poll_until, ActionError, ElementState, Locator, WaitOptions};
use async_trait::async_trait;
use tracing::{debug, info};
use webcycle_driver::BrowserDriver;

use crate::{
    errors::LocatorError,
    strategies::probe_strategy,
    types::{Probe, ResolutionResult},
};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Evaluate every strategy once, in declared order.
    async fn probe(
        &self,
        driver: &dyn BrowserDriver,
        locator: &Locator,
        state: ElementState,
    ) -> Result<Probe, LocatorError>;

    /// Probe until an element resolves or the wait elapses.
    async fn resolve(
        &self,
        driver: &dyn BrowserDriver,
        locator: &Locator,
        state: ElementState,
        wait: &WaitOptions,
    ) -> Result<ResolutionResult, LocatorError>;

    /// Probe until no strategy yields a displayed element.
    async fn wait_gone(
        &self,
        driver: &dyn BrowserDriver,
        locator: &Locator,
        wait: &WaitOptions,
    ) -> Result<(), LocatorError>;
}

/// Default element resolver implementation
#[derive(Debug, Clone, Default)]
pub struct DefaultElementResolver;

impl DefaultElementResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ElementResolver for DefaultElementResolver {
    async fn probe(
        &self,
        driver: &dyn BrowserDriver,
        locator: &Locator,
        state: ElementState,
    ) -> Result<Probe, LocatorError> {
        for (index, by) in locator.strategies().iter().enumerate() {
            if let Some(element) = probe_strategy(driver, by, state).await? {
                debug!(strategy = %by, index, %element, "strategy matched");
                return Ok(Probe::Resolved(ResolutionResult {
                    element,
                    strategy: by.clone(),
                    strategy_index: index,
                }));
            }
        }
        Ok(Probe::NotFound)
    }

    async fn resolve(
        &self,
        driver: &dyn BrowserDriver,
        locator: &Locator,
        state: ElementState,
        wait: &WaitOptions,
    ) -> Result<ResolutionResult, LocatorError> {
        let what = format!("{} {:?}", locator, state);
        let outcome = poll_until(wait, &what, || async move {
            match self.probe(driver, locator, state).await {
                Ok(probe) => Ok(probe.into_resolved()),
                Err(LocatorError::Action(err)) => Err(err),
                Err(other) => Err(ActionError::Driver(other.to_string())),
            }
        })
        .await;

        match outcome {
            Ok(result) => {
                info!(
                    locator = %locator,
                    strategy = %result.strategy,
                    element = %result.element,
                    "Resolved element"
                );
                Ok(result)
            }
            Err(ActionError::WaitTimeout(_)) => Err(LocatorError::ElementNotFound {
                locator: locator.to_string(),
                timeout_ms: wait.timeout_ms,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn wait_gone(
        &self,
        driver: &dyn BrowserDriver,
        locator: &Locator,
        wait: &WaitOptions,
    ) -> Result<(), LocatorError> {
        let what = format!("{} gone", locator);
        let outcome = poll_until(wait, &what, || async move {
            match self.probe(driver, locator, ElementState::Visible).await {
                Ok(Probe::NotFound) => Ok(Some(())),
                Ok(Probe::Resolved(_)) => Ok(None),
                Err(LocatorError::Action(err)) => Err(err),
                Err(other) => Err(ActionError::Driver(other.to_string())),
            }
        })
        .await;

        match outcome {
            Ok(()) => Ok(()),
            Err(ActionError::WaitTimeout(_)) => Err(LocatorError::StillVisible {
                locator: locator.to_string(),
                timeout_ms: wait.timeout_ms,
            }),
            Err(err) => Err(err.into()),
        }
    }
}
