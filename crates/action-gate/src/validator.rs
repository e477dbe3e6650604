//! Gate validator

use std::sync::Arc;

use action_locator::{DefaultElementResolver, ElementResolver, Probe};
use action_primitives::{absorb_transient, ElementState, Locator};
use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use webcycle_driver::BrowserDriver;

use crate::{conditions::Condition, errors::GateError, types::*};

/// Gate validator trait
#[async_trait]
pub trait GateValidator: Send + Sync {
    /// Poll the spec until it passes or its timeout elapses.
    ///
    /// An unmet spec is `Ok` with `passed == false`; errors are reserved for
    /// failures that make the page unobservable.
    async fn validate(
        &self,
        driver: &dyn BrowserDriver,
        spec: &ExpectSpec,
    ) -> Result<GateResult, GateError>;

    /// Evaluate the spec exactly once.
    async fn check_once(
        &self,
        driver: &dyn BrowserDriver,
        spec: &ExpectSpec,
    ) -> Result<GateResult, GateError>;

    async fn validate_condition(
        &self,
        driver: &dyn BrowserDriver,
        condition: &Condition,
    ) -> Result<bool, GateError>;
}

/// Default gate validator implementation
pub struct DefaultGateValidator {
    resolver: Arc<dyn ElementResolver>,
}

impl DefaultGateValidator {
    pub fn new(resolver: Arc<dyn ElementResolver>) -> Self {
        Self { resolver }
    }

    async fn probe(
        &self,
        driver: &dyn BrowserDriver,
        locator: &Locator,
        state: ElementState,
    ) -> Result<Probe, GateError> {
        Ok(self.resolver.probe(driver, locator, state).await?)
    }
}

impl Default for DefaultGateValidator {
    fn default() -> Self {
        Self::new(Arc::new(DefaultElementResolver::new()))
    }
}

#[async_trait]
impl GateValidator for DefaultGateValidator {
    async fn validate(
        &self,
        driver: &dyn BrowserDriver,
        spec: &ExpectSpec,
    ) -> Result<GateResult, GateError> {
        let start = Instant::now();
        let wait = spec.wait_options();
        let deadline = start + wait.timeout();
        let mut evaluations = 0;

        loop {
            evaluations += 1;
            let mut result = self.check_once(driver, spec).await?;
            let now = Instant::now();
            if result.passed || now >= deadline {
                result.evaluations = evaluations;
                result.latency_ms = start.elapsed().as_millis() as u64;
                if result.passed {
                    debug!(evaluations, "gate passed");
                } else {
                    warn!(
                        timeout_ms = spec.timeout_ms,
                        reasons = %result.summary(),
                        "gate not satisfied"
                    );
                }
                return Ok(result);
            }
            sleep(wait.poll_interval().min(deadline - now)).await;
        }
    }

    async fn check_once(
        &self,
        driver: &dyn BrowserDriver,
        spec: &ExpectSpec,
    ) -> Result<GateResult, GateError> {
        if !spec.has_conditions() {
            return Ok(GateResult::pass());
        }

        let mut reasons = Vec::new();

        for condition in &spec.all {
            if !self.validate_condition(driver, condition).await? {
                reasons.push(format!("expected {}", condition));
            }
        }

        if !spec.any.is_empty() {
            let mut any_passed = false;
            for condition in &spec.any {
                if self.validate_condition(driver, condition).await? {
                    any_passed = true;
                    break;
                }
            }
            if !any_passed {
                let options: Vec<String> = spec.any.iter().map(|c| c.to_string()).collect();
                reasons.push(format!("expected one of: {}", options.join(", ")));
            }
        }

        for condition in &spec.deny {
            if self.validate_condition(driver, condition).await? {
                reasons.push(format!("denied {}", condition));
            }
        }

        Ok(if reasons.is_empty() {
            GateResult::pass()
        } else {
            GateResult::fail(reasons)
        })
    }

    async fn validate_condition(
        &self,
        driver: &dyn BrowserDriver,
        condition: &Condition,
    ) -> Result<bool, GateError> {
        let holds = match condition {
            Condition::ElementPresent(locator) => self
                .probe(driver, locator, ElementState::Present)
                .await?
                .is_resolved(),
            Condition::ElementVisible(locator) => self
                .probe(driver, locator, ElementState::Visible)
                .await?
                .is_resolved(),
            Condition::ElementHidden(locator) => !self
                .probe(driver, locator, ElementState::Visible)
                .await?
                .is_resolved(),
            Condition::UrlContains(fragment) => {
                let url = driver.current_url().await.map_err(action_primitives::ActionError::from)?;
                url.contains(fragment.as_str())
            }
            Condition::AttributeContains {
                locator,
                name,
                value,
            } => match self.probe(driver, locator, ElementState::Present).await? {
                Probe::Resolved(found) => {
                    let attribute = driver.attribute(&found.element, name).await;
                    absorb_transient(
                        attribute.map(|v| v.is_some_and(|v| v.contains(value.as_str()))),
                    )?
                }
                Probe::NotFound => false,
            },
            Condition::TextContains { locator, text } => {
                match self.probe(driver, locator, ElementState::Visible).await? {
                    Probe::Resolved(found) => {
                        let observed = driver.text(&found.element).await;
                        absorb_transient(observed.map(|t| t.contains(text.as_str())))?
                    }
                    Probe::NotFound => false,
                }
            }
        };
        if holds {
            info!(condition = %condition, "condition holds");
        }
        Ok(holds)
    }
}
