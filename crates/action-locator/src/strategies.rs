//! Single-strategy evaluation

use action_primitives::{element_in_state, ActionError, ElementState};
use tracing::{debug, trace};
use webcycle_core_types::{By, ElementHandle};
use webcycle_driver::BrowserDriver;

/// Query one strategy and return the first match, in document order, that
/// satisfies `state`.
///
/// "Nothing matched yet", stale candidates and a query the browser rejects
/// are `Ok(None)`; context and session failures propagate.
pub async fn probe_strategy(
    driver: &dyn BrowserDriver,
    by: &By,
    state: ElementState,
) -> Result<Option<ElementHandle>, ActionError> {
    let candidates = match driver.find_all(by).await {
        Ok(found) => found,
        Err(err) if err.is_transient() => {
            trace!(strategy = %by, error = %err, "strategy query absorbed");
            return Ok(None);
        }
        Err(err) if err.is_session_lost() || err.is_context_loss() => return Err(err.into()),
        Err(err) => {
            // a rejected selector only disqualifies this strategy
            debug!(strategy = %by, error = %err, "strategy query failed, skipping");
            return Ok(None);
        }
    };

    for candidate in candidates {
        if element_in_state(driver, &candidate, state).await? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcycle_driver::{DriverErrorKind, FakeDriver, FakeElement};

    #[tokio::test]
    async fn first_match_in_state_wins() {
        let driver = FakeDriver::new("https://example.test/");
        let by = By::Css("button.refresh".into());
        driver.add_element(driver.root(), FakeElement::new("hidden").matching(by.clone()).hidden());
        let visible = driver.add_element(driver.root(), FakeElement::new("shown").matching(by.clone()));
        driver.add_element(driver.root(), FakeElement::new("later").matching(by.clone()));

        assert_eq!(
            probe_strategy(&driver, &by, ElementState::Visible).await.unwrap(),
            Some(visible)
        );
        assert_eq!(
            probe_strategy(&driver, &by, ElementState::Present)
                .await
                .unwrap()
                .map(|h| h.0),
            Some("hidden".to_string())
        );
    }

    #[tokio::test]
    async fn lost_session_propagates() {
        let driver = FakeDriver::new("https://example.test/");
        driver.lose_session();
        let err = probe_strategy(&driver, &By::Id("x".into()), ElementState::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::SessionLost(_)));
    }

    #[tokio::test]
    async fn rejected_query_is_a_miss() {
        let driver = FakeDriver::new("https://example.test/");
        let broken = By::XPath("//iframe[".into());
        driver.reject_strategy(broken.clone(), DriverErrorKind::Internal);
        driver.reject_strategy(By::Css("div:bogus(".into()), DriverErrorKind::Script);

        assert_eq!(
            probe_strategy(&driver, &broken, ElementState::Present).await.unwrap(),
            None
        );
        assert_eq!(
            probe_strategy(&driver, &By::Css("div:bogus(".into()), ElementState::Present)
                .await
                .unwrap(),
            None
        );
    }
}
