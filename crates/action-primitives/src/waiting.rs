//! Bounded polling waits
//!
//! Every wait in the engine is the same loop: evaluate, sleep one poll
//! quantum, repeat until the deadline. The predicate is always evaluated at
//! least once, and once more at the deadline, so a zero timeout still gives a
//! single observation.

use std::future::Future;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace};
use webcycle_core_types::ElementHandle;
use webcycle_driver::{BrowserDriver, DriverError};

use crate::{
    errors::ActionError,
    types::{ElementState, WaitOptions},
};

const READY_STATE_SCRIPT: &str = "return document.readyState;";

/// Poll `check` until it yields `Some`, failing with `WaitTimeout` at the
/// deadline. Errors from `check` propagate immediately.
pub async fn poll_until<T, F, Fut>(
    options: &WaitOptions,
    what: &str,
    mut check: F,
) -> Result<T, ActionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ActionError>>,
{
    let started = Instant::now();
    let deadline = started + options.timeout();
    let mut ticks = 0u32;
    loop {
        ticks += 1;
        if let Some(value) = check().await? {
            trace!(what, ticks, "wait satisfied");
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            debug!(what, ticks, timeout_ms = options.timeout_ms, "wait timed out");
            return Err(ActionError::WaitTimeout(format!(
                "{} not satisfied after {}ms",
                what, options.timeout_ms
            )));
        }
        sleep(options.poll_interval().min(deadline - now)).await;
    }
}

/// Wait for a custom boolean predicate.
pub async fn wait_for_predicate<F, Fut>(
    options: &WaitOptions,
    what: &str,
    mut predicate: F,
) -> Result<(), ActionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ActionError>>,
{
    poll_until(options, what, || {
        let fut = predicate();
        async move { Ok(fut.await?.then_some(())) }
    })
    .await
}

/// Whether `element` currently satisfies `state`.
///
/// A stale or vanished handle is a negative observation, not an error.
pub async fn element_in_state(
    driver: &dyn BrowserDriver,
    element: &ElementHandle,
    state: ElementState,
) -> Result<bool, ActionError> {
    let observed = async {
        match state {
            ElementState::Present => driver.is_displayed(element).await.map(|_| true),
            ElementState::Visible => driver.is_displayed(element).await,
            ElementState::Clickable => {
                Ok(driver.is_displayed(element).await? && driver.is_enabled(element).await?)
            }
        }
    }
    .await;
    absorb_transient(observed)
}

/// Turn transient driver failures into `false`.
pub fn absorb_transient(result: Result<bool, DriverError>) -> Result<bool, ActionError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_transient() => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Wait until `document.readyState` reports `complete` in the current
/// document.
pub async fn wait_for_ready_state(
    driver: &dyn BrowserDriver,
    options: &WaitOptions,
) -> Result<(), ActionError> {
    wait_for_predicate(options, "document ready state", || async move {
        let state = driver.execute_script(READY_STATE_SCRIPT, Vec::new()).await?;
        Ok(state.as_str() == Some("complete"))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use webcycle_driver::{FakeDriver, FakeElement};

    #[tokio::test(start_paused = true)]
    async fn poll_until_times_out_at_deadline() {
        let started = Instant::now();
        let mut calls = 0;
        let result: Result<(), _> = poll_until(&WaitOptions::new(1_000, 100), "never", || {
            calls += 1;
            async { Ok(None) }
        })
        .await;
        assert!(matches!(result, Err(ActionError::WaitTimeout(_))));
        assert_eq!(started.elapsed(), Duration::from_millis(1_000));
        assert_eq!(calls, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_checks_once() {
        let mut calls = 0;
        let result: Result<(), _> = poll_until(&WaitOptions::new(0, 100), "once", || {
            calls += 1;
            async { Ok(None) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_stop_polling() {
        let mut calls = 0;
        let result: Result<(), _> = poll_until(&WaitOptions::new(5_000, 100), "fatal", || {
            calls += 1;
            async { Err(ActionError::SessionLost("closed".into())) }
        })
        .await;
        assert!(matches!(result, Err(ActionError::SessionLost(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn state_checks_absorb_stale_handles() {
        let driver = FakeDriver::new("https://example.test/");
        let hidden = driver.add_element(driver.root(), FakeElement::new("h").hidden());
        let disabled = driver.add_element(driver.root(), FakeElement::new("d").disabled());

        assert!(element_in_state(&driver, &hidden, ElementState::Present).await.unwrap());
        assert!(!element_in_state(&driver, &hidden, ElementState::Visible).await.unwrap());
        assert!(element_in_state(&driver, &disabled, ElementState::Visible).await.unwrap());
        assert!(!element_in_state(&driver, &disabled, ElementState::Clickable).await.unwrap());

        driver.remove_element(&hidden);
        assert!(!element_in_state(&driver, &hidden, ElementState::Visible).await.unwrap());
    }

    #[test]
    fn ready_state_resolves_on_fake_driver() {
        let driver = FakeDriver::new("https://example.test/");
        tokio_test::block_on(wait_for_ready_state(&driver, &WaitOptions::default())).unwrap();
    }
}
