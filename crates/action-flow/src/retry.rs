//! Bounded retry with backoff and a degraded fallback

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::errors::FlowError;
use crate::types::{FallbackAction, RetryPolicy};

/// One fallible unit of work driven by [`RetryExecutor`].
#[async_trait]
pub trait Attempt: Send {
    type Output: Send;

    /// Run attempt number `attempt` (1-based).
    async fn run(&mut self, attempt: u32) -> Result<Self::Output, FlowError>;

    /// Run the degraded action once after every normal attempt failed.
    async fn fallback(&mut self, action: FallbackAction) -> Result<Self::Output, FlowError> {
        Err(FlowError::Invalid(format!(
            "fallback {:?} is not supported here",
            action
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T> {
    pub value: T,
    /// Normal attempts made, fallback excluded
    pub attempts: u32,
    pub via_fallback: bool,
}

/// Runs an [`Attempt`] under a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor;

impl RetryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Fatal and invalid errors stop immediately; anything else is retried
    /// until `max_attempts`, then the fallback runs once when configured.
    pub async fn execute<A: Attempt>(
        &self,
        policy: &RetryPolicy,
        operation: &mut A,
    ) -> Result<RetryOutcome<A::Output>, FlowError> {
        policy.validate()?;
        let max_attempts = policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match operation.run(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, "succeeded after retry");
                    }
                    return Ok(RetryOutcome {
                        value,
                        attempts: attempt,
                        via_fallback: false,
                    });
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    warn!(attempt, max_attempts, error = %err, "attempt failed");
                    last_error = Some(err);
                    if attempt < max_attempts {
                        sleep(policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        if let Some(action) = policy.fallback {
            info!(?action, "normal attempts exhausted, trying fallback");
            match operation.fallback(action).await {
                Ok(value) => {
                    return Ok(RetryOutcome {
                        value,
                        attempts: max_attempts,
                        via_fallback: true,
                    })
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "fallback failed");
                    last_error = Some(err);
                }
            }
        }

        let last = last_error
            .unwrap_or_else(|| FlowError::Invalid("no attempt was made".to_string()));
        Err(FlowError::RetryExhausted {
            attempts: max_attempts,
            last: Box::new(last),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::ActionError;
    use std::time::Duration;
    use tokio::time::Instant;
    use webcycle_core_types::ErrorKind;

    /// Fails until `succeed_on`, recording every call.
    struct Scripted {
        succeed_on: Option<u32>,
        fallback_ok: bool,
        calls: Vec<String>,
        error: ActionError,
    }

    impl Scripted {
        fn failing() -> Self {
            Self {
                succeed_on: None,
                fallback_ok: false,
                calls: Vec::new(),
                error: ActionError::ElementNotFound("#ok".into()),
            }
        }
    }

    #[async_trait]
    impl Attempt for Scripted {
        type Output = u32;

        async fn run(&mut self, attempt: u32) -> Result<u32, FlowError> {
            self.calls.push(format!("run{}", attempt));
            if self.succeed_on == Some(attempt) {
                Ok(attempt)
            } else {
                Err(self.error.clone().into())
            }
        }

        async fn fallback(&mut self, _action: FallbackAction) -> Result<u32, FlowError> {
            self.calls.push("fallback".into());
            if self.fallback_ok {
                Ok(0)
            } else {
                Err(self.error.clone().into())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_runs_exactly_max_attempts() {
        let mut op = Scripted::failing();
        let start = Instant::now();
        let err = RetryExecutor::new()
            .execute(&RetryPolicy::new(3, 500), &mut op)
            .await
            .unwrap_err();

        assert_eq!(op.calls, vec!["run1", "run2", "run3"]);
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));
        match err {
            FlowError::RetryExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.kind(), ErrorKind::ElementNotFound);
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_adds_one_call() {
        let mut op = Scripted::failing();
        let policy = RetryPolicy::new(2, 100).with_fallback(FallbackAction::ScriptClick);
        let err = RetryExecutor::new().execute(&policy, &mut op).await.unwrap_err();
        assert_eq!(op.calls, vec!["run1", "run2", "fallback"]);
        assert_eq!(err.kind(), ErrorKind::RetryExhausted);

        let mut op = Scripted {
            fallback_ok: true,
            ..Scripted::failing()
        };
        let outcome = RetryExecutor::new().execute(&policy, &mut op).await.unwrap();
        assert!(outcome.via_fallback);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn success_stops_further_attempts() {
        let mut op = Scripted {
            succeed_on: Some(2),
            ..Scripted::failing()
        };
        let policy = RetryPolicy::new(5, 1_000)
            .exponential()
            .with_fallback(FallbackAction::ScriptClick);
        let outcome = RetryExecutor::new().execute(&policy, &mut op).await.unwrap();

        assert_eq!(outcome.value, 2);
        assert_eq!(outcome.attempts, 2);
        assert!(!outcome.via_fallback);
        assert_eq!(op.calls, vec!["run1", "run2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_is_not_retried() {
        let mut op = Scripted {
            error: ActionError::SessionLost("invalid session id".into()),
            ..Scripted::failing()
        };
        let policy = RetryPolicy::new(4, 100).with_fallback(FallbackAction::ScriptClick);
        let err = RetryExecutor::new().execute(&policy, &mut op).await.unwrap_err();

        assert_eq!(op.calls, vec!["run1"]);
        assert_eq!(err.kind(), ErrorKind::SessionLost);
    }

    #[tokio::test]
    async fn zero_attempts_is_rejected() {
        let mut op = Scripted::failing();
        let err = RetryExecutor::new()
            .execute(&RetryPolicy::new(0, 0), &mut op)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(op.calls.is_empty());
    }
}
