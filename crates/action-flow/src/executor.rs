//! Step execution state machine
//!
//! A step moves `Pending → ContextEstablished → ElementResolved →
//! InteractionApplied → Verified`. Context establishment happens once per
//! step; the resolve/interact/verify unit runs under the step's
//! [`RetryPolicy`] through [`RetryExecutor`]. Attempts after the first
//! re-check whether the previous attempt already took effect (a new window
//! appeared, the post-condition holds) before repeating the interaction.

use std::sync::Arc;
use std::time::Duration;

use action_context::{ContextManager, ContextState, WindowTarget};
use action_gate::{DefaultGateValidator, GateError, GateValidator};
use action_locator::LocatorError;
use action_primitives::{
    poll_until, ActionError, DefaultActionPrimitives, ElementState, Interaction, WaitOptions,
};
use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use webcycle_core_types::WindowHandle;

use crate::errors::FlowError;
use crate::events::{EventSink, StepEvent, TracingSink};
use crate::retry::{Attempt, RetryExecutor};
use crate::types::{
    ActionStep, FallbackAction, RetryPolicy, StepOutcome, StepPhase, StepReport, WindowSpawn,
};

/// Executes [`ActionStep`]s against a [`ContextManager`].
pub struct StepExecutor {
    primitives: DefaultActionPrimitives,
    gate: Arc<dyn GateValidator>,
    sink: Arc<dyn EventSink>,
    retry: RetryExecutor,
    default_wait: WaitOptions,
}

impl StepExecutor {
    pub fn new(gate: Arc<dyn GateValidator>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            primitives: DefaultActionPrimitives::default(),
            gate,
            sink,
            retry: RetryExecutor::new(),
            default_wait: WaitOptions::default(),
        }
    }

    pub fn with_primitives(mut self, primitives: DefaultActionPrimitives) -> Self {
        self.primitives = primitives;
        self
    }

    /// Element wait used by steps that do not carry their own.
    pub fn with_default_wait(mut self, wait: WaitOptions) -> Self {
        self.default_wait = wait;
        self
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    pub fn gate(&self) -> &dyn GateValidator {
        self.gate.as_ref()
    }

    pub fn default_wait(&self) -> WaitOptions {
        self.default_wait
    }

    /// Run `step` once to completion; failures are reported, not returned.
    pub async fn execute_step(&self, ctx: &mut ContextManager, step: &ActionStep) -> StepReport {
        self.run_step(ctx, step).await.0
    }

    /// Like [`execute_step`](Self::execute_step), also handing back the
    /// error behind a failed report.
    pub(crate) async fn run_step(
        &self,
        ctx: &mut ContextManager,
        step: &ActionStep,
    ) -> (StepReport, Option<FlowError>) {
        let start = Instant::now();
        self.sink.emit(StepEvent::StepStarted {
            step: step.name.clone(),
        });

        let mut attempt = StepAttempt::new(self, ctx, step);
        let result = attempt.drive().await;
        let phase = attempt.phase;
        let attempts = attempt.attempts;

        match result {
            Ok(done) => {
                if step.settle_ms > 0 {
                    sleep(Duration::from_millis(step.settle_ms)).await;
                }
                let latency_ms = start.elapsed().as_millis() as u64;
                self.sink.emit(StepEvent::StepSucceeded {
                    step: step.name.clone(),
                    attempts,
                    confirmed_by_fallback: done.confirmed_by_fallback,
                    latency_ms,
                });
                let report = StepReport {
                    step: step.name.clone(),
                    outcome: StepOutcome::Success {
                        confirmed_by_fallback: done.confirmed_by_fallback,
                    },
                    phase,
                    attempts,
                    used_fallback_action: done.used_fallback_action,
                    value: done.output.value,
                    new_window: done.output.new_window,
                    best_effort: step.best_effort,
                    latency_ms,
                };
                (report, None)
            }
            Err(err) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                self.sink.emit(StepEvent::StepFailed {
                    step: step.name.clone(),
                    kind: err.kind(),
                    reason: err.to_string(),
                    best_effort: step.best_effort,
                });
                let report = StepReport {
                    step: step.name.clone(),
                    outcome: StepOutcome::Failure {
                        kind: err.kind(),
                        reason: err.to_string(),
                    },
                    phase,
                    attempts,
                    used_fallback_action: false,
                    value: None,
                    new_window: None,
                    best_effort: step.best_effort,
                    latency_ms,
                };
                (report, Some(err))
            }
        }
    }
}

impl Default for StepExecutor {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultGateValidator::default()),
            Arc::new(TracingSink),
        )
    }
}

#[derive(Debug, Default)]
struct AttemptOutput {
    value: Option<String>,
    new_window: Option<WindowHandle>,
}

struct Completed {
    output: AttemptOutput,
    used_fallback_action: bool,
    confirmed_by_fallback: bool,
}

/// Mutable state of one step execution.
struct StepAttempt<'a> {
    executor: &'a StepExecutor,
    ctx: &'a mut ContextManager,
    step: &'a ActionStep,
    /// Window handles recorded before the first interaction
    before: Vec<WindowHandle>,
    phase: StepPhase,
    attempts: u32,
}

impl<'a> StepAttempt<'a> {
    fn new(executor: &'a StepExecutor, ctx: &'a mut ContextManager, step: &'a ActionStep) -> Self {
        Self {
            executor,
            ctx,
            step,
            before: Vec::new(),
            phase: StepPhase::Pending,
            attempts: 0,
        }
    }

    fn advance(&mut self, phase: StepPhase) {
        self.phase = self.phase.max(phase);
    }

    async fn drive(&mut self) -> Result<Completed, FlowError> {
        let step = self.step;
        step.validate()?;

        if let Some(requirement) = &step.context {
            self.ctx.establish_with_recovery(requirement).await?;
        }
        self.advance(StepPhase::ContextEstablished);

        if step.window_spawn.is_some() {
            self.before = self.ctx.window_handles().await?;
            debug!(step = %step.name, windows = self.before.len(), "recorded window handles");
        }

        let policy = step.retry_policy();
        let retry = self.executor.retry;
        match retry.execute(&policy, self).await {
            Ok(outcome) => Ok(Completed {
                output: outcome.value,
                used_fallback_action: outcome.via_fallback,
                confirmed_by_fallback: false,
            }),
            Err(err) if !err.is_retryable() => Err(err),
            Err(err) => self.recover(single_attempt_cause(err, &policy)).await,
        }
    }

    /// Last chance after exhaustion: the fallback signal, then a final
    /// window enumeration for window-spawning steps.
    async fn recover(&mut self, err: FlowError) -> Result<Completed, FlowError> {
        let step = self.step;
        let mut confirmed = false;

        if let Some(signal) = &step.fallback_signal {
            match self.executor.gate.check_once(self.ctx.driver(), signal).await {
                Ok(result) if result.passed => confirmed = true,
                Ok(result) => debug!(step = %step.name, reasons = %result.summary(), "fallback signal not met"),
                Err(gate_err) if gate_err.kind().is_fatal() => return Err(gate_err.into()),
                Err(gate_err) => debug!(step = %step.name, error = %gate_err, "fallback signal unobservable"),
            }
        }

        let mut new_window = None;
        if let Some(spawn) = step.window_spawn {
            let fresh = self.new_windows().await?;
            if let Some(handle) = self.single_new(fresh, spawn)? {
                new_window = Some(self.adopt_window(spawn, handle).await?);
                confirmed = true;
            }
        }

        if !confirmed {
            return Err(err);
        }
        info!(step = %step.name, error = %err, "step confirmed by fallback signal");
        Ok(Completed {
            output: AttemptOutput {
                value: None,
                new_window,
            },
            used_fallback_action: false,
            confirmed_by_fallback: true,
        })
    }

    fn observe(&mut self, err: FlowError) -> FlowError {
        if let Some(action) = action_error(&err) {
            self.ctx.observe_error(action);
        }
        err
    }

    /// Re-enter the step's frames when an earlier attempt lost them.
    async fn restore_context(&mut self) -> Result<(), FlowError> {
        if *self.ctx.state() != ContextState::ContextLost {
            return Ok(());
        }
        let frames = match &self.step.context {
            Some(requirement) => requirement.frames.clone(),
            None => self.ctx.context().frame_path.clone(),
        };
        info!(step = %self.step.name, depth = frames.len(), "re-establishing lost context");
        self.ctx.enter_with_recovery(&frames).await?;
        Ok(())
    }

    /// Guard for attempts after the first; `Some` when the previous attempt
    /// already took effect.
    async fn already_done(&mut self) -> Result<Option<AttemptOutput>, FlowError> {
        let step = self.step;
        if let Some(spawn) = step.window_spawn {
            let fresh = self.new_windows().await?;
            let Some(handle) = self.single_new(fresh, spawn)? else {
                return Ok(None);
            };
            info!(step = %step.name, window = %handle, "window already opened, skipping interaction");
            let handle = self.adopt_window(spawn, handle).await?;
            self.verify_expect().await?;
            self.advance(StepPhase::Verified);
            return Ok(Some(AttemptOutput {
                value: None,
                new_window: Some(handle),
            }));
        }

        if let Some(expect) = &step.expect {
            let result = self
                .executor
                .gate
                .check_once(self.ctx.driver(), expect)
                .await?;
            if result.passed {
                info!(step = %step.name, "post-condition already holds, skipping interaction");
                self.advance(StepPhase::Verified);
                return Ok(Some(AttemptOutput::default()));
            }
        }
        Ok(None)
    }

    /// Resolve the target in `state`, apply `interaction`, then detect the
    /// spawned window and verify the post-condition.
    async fn perform(
        &mut self,
        interaction: &Interaction,
        state: ElementState,
    ) -> Result<AttemptOutput, FlowError> {
        let step = self.step;
        let element = match &step.locator {
            Some(locator) if interaction.needs_element() => {
                let wait = step.wait.unwrap_or(self.executor.default_wait);
                let resolved = self
                    .ctx
                    .resolver()
                    .resolve(self.ctx.driver(), locator, state, &wait)
                    .await?;
                self.advance(StepPhase::ElementResolved);
                Some(resolved.element)
            }
            _ => None,
        };

        let report = self
            .executor
            .primitives
            .apply(self.ctx.driver(), element.as_ref(), interaction)
            .await?;
        self.advance(StepPhase::InteractionApplied);
        if report.skipped {
            debug!(step = %step.name, "interaction not needed");
        }

        let mut new_window = None;
        if let Some(spawn) = step.window_spawn {
            let handle = self.await_new_window(spawn).await?;
            new_window = Some(self.adopt_window(spawn, handle).await?);
        }
        self.verify_expect().await?;
        self.advance(StepPhase::Verified);

        Ok(AttemptOutput {
            value: report.value,
            new_window,
        })
    }

    async fn verify_expect(&mut self) -> Result<(), FlowError> {
        let Some(expect) = &self.step.expect else {
            return Ok(());
        };
        let result = self.executor.gate.validate(self.ctx.driver(), expect).await?;
        if result.passed {
            Ok(())
        } else {
            Err(FlowError::PostConditionFailed {
                step: self.step.name.clone(),
                reasons: result.summary(),
            })
        }
    }

    async fn new_windows(&self) -> Result<Vec<WindowHandle>, FlowError> {
        let handles = self.ctx.window_handles().await?;
        Ok(handles
            .into_iter()
            .filter(|handle| !self.before.contains(handle))
            .collect())
    }

    /// Exactly one new handle is a spawned window; more is a failure.
    fn single_new(
        &self,
        fresh: Vec<WindowHandle>,
        spawn: WindowSpawn,
    ) -> Result<Option<WindowHandle>, FlowError> {
        if fresh.len() > 1 {
            return Err(FlowError::WindowNotOpened {
                step: self.step.name.clone(),
                before: self.before.len(),
                after: self.before.len() + fresh.len(),
                timeout_ms: spawn.timeout_ms,
            });
        }
        Ok(fresh.into_iter().next())
    }

    async fn await_new_window(&self, spawn: WindowSpawn) -> Result<WindowHandle, FlowError> {
        let wait = WaitOptions::new(spawn.timeout_ms, self.executor.default_wait.poll_interval_ms);
        let driver = self.ctx.driver();
        let before = self.before.as_slice();
        let found = poll_until(&wait, "new window", || async move {
            let handles = driver.window_handles().await?;
            let fresh: Vec<WindowHandle> = handles
                .into_iter()
                .filter(|handle| !before.contains(handle))
                .collect();
            Ok((!fresh.is_empty()).then_some(fresh))
        })
        .await;

        match found {
            Ok(fresh) => self.single_new(fresh, spawn)?.ok_or_else(|| {
                FlowError::Invalid("window poll returned no handle".to_string())
            }),
            Err(ActionError::WaitTimeout(_)) => {
                let after = self.ctx.window_count().await.unwrap_or(self.before.len());
                warn!(step = %self.step.name, before = self.before.len(), after, "no new window");
                Err(FlowError::WindowNotOpened {
                    step: self.step.name.clone(),
                    before: self.before.len(),
                    after,
                    timeout_ms: spawn.timeout_ms,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn adopt_window(
        &mut self,
        spawn: WindowSpawn,
        handle: WindowHandle,
    ) -> Result<WindowHandle, FlowError> {
        if spawn.switch {
            self.ctx
                .switch_window(&WindowTarget::Handle(handle.clone()))
                .await?;
        }
        info!(step = %self.step.name, window = %handle, switched = spawn.switch, "new window opened");
        Ok(handle)
    }
}

#[async_trait]
impl Attempt for StepAttempt<'_> {
    type Output = AttemptOutput;

    async fn run(&mut self, attempt: u32) -> Result<AttemptOutput, FlowError> {
        self.attempts = attempt;
        let step = self.step;
        if attempt > 1 {
            self.restore_context().await?;
            if let Some(output) = self.already_done().await? {
                return Ok(output);
            }
        }
        match self.perform(&step.interaction, step.element_state()).await {
            Ok(output) => Ok(output),
            Err(err) => Err(self.observe(err)),
        }
    }

    async fn fallback(&mut self, action: FallbackAction) -> Result<AttemptOutput, FlowError> {
        self.restore_context().await?;
        if let Some(output) = self.already_done().await? {
            return Ok(output);
        }
        let interaction = match action {
            FallbackAction::ScriptClick => Interaction::ScriptClick,
        };
        info!(step = %self.step.name, ?action, "running fallback action");
        // the degraded action only needs the element attached, not interactable
        match self.perform(&interaction, interaction.required_state()).await {
            Ok(output) => Ok(output),
            Err(err) => Err(self.observe(err)),
        }
    }
}

/// A single attempt without fallback reports its own error kind rather than
/// `RetryExhausted`.
fn single_attempt_cause(err: FlowError, policy: &RetryPolicy) -> FlowError {
    match err {
        FlowError::RetryExhausted { attempts: 1, last } if policy.fallback.is_none() => *last,
        other => other,
    }
}

fn action_error(err: &FlowError) -> Option<&ActionError> {
    match err {
        FlowError::Action(action) => Some(action),
        FlowError::Locator(LocatorError::Action(action)) => Some(action),
        FlowError::Gate(GateError::Action(action)) => Some(action),
        FlowError::RetryExhausted { last, .. } => action_error(last),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BroadcastSink;
    use action_context::{ContextRequirement, ContextSettings};
    use action_gate::{Condition, ExpectSpec};
    use action_primitives::Locator;
    use webcycle_core_types::{By, ElementHandle, ErrorKind};
    use webcycle_driver::{BrowserDriver, ClickEffect, FakeDriver, FakeElement};

    fn loc(by: By) -> Locator {
        Locator::single(by)
    }

    fn setup() -> (Arc<FakeDriver>, ContextManager, StepExecutor) {
        let driver = Arc::new(FakeDriver::new("https://portal.test/home"));
        let ctx = ContextManager::new(driver.clone(), ContextSettings::default());
        let executor = StepExecutor::default().with_default_wait(WaitOptions::new(1_000, 100));
        (driver, ctx, executor)
    }

    fn job_link(driver: &FakeDriver, delay: Duration) -> ElementHandle {
        let popup = driver.add_document();
        driver.add_element(
            driver.root(),
            FakeElement::new("jobs")
                .matching(By::LinkText("Job Management".into()))
                .on_click(ClickEffect::OpenWindow {
                    document: popup,
                    url: "https://portal.test/job-management".into(),
                    delay,
                }),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn click_with_post_condition() {
        let (driver, mut ctx, executor) = setup();
        let panel = driver.add_element(
            driver.root(),
            FakeElement::new("panel").matching(By::Id("panel".into())).hidden(),
        );
        driver.add_element(
            driver.root(),
            FakeElement::new("toggle")
                .matching(By::Css("button.toggle".into()))
                .on_click(ClickEffect::SetDisplayed {
                    element: panel,
                    displayed: true,
                }),
        );
        let step = ActionStep::new("open panel", Interaction::Click)
            .on(loc(By::Css("button.toggle".into())))
            .expect(ExpectSpec::new().with_all(Condition::ElementVisible(loc(By::Id(
                "panel".into(),
            )))));

        let report = executor.execute_step(&mut ctx, &step).await;
        assert_eq!(
            report.outcome,
            StepOutcome::Success {
                confirmed_by_fallback: false
            }
        );
        assert_eq!(report.phase, StepPhase::Verified);
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn window_spawn_switches_to_new_handle() {
        let (driver, mut ctx, executor) = setup();
        let link = job_link(&driver, Duration::from_millis(500));
        let step = ActionStep::new("job management", Interaction::Click)
            .on(loc(By::LinkText("Job Management".into())))
            .spawns_window(WindowSpawn {
                timeout_ms: 2_000,
                switch: true,
            });

        let report = executor.execute_step(&mut ctx, &step).await;
        assert!(report.outcome.is_success(), "{:?}", report.outcome);
        assert_eq!(report.new_window, Some(WindowHandle::new("window-2")));
        assert_eq!(driver.current_window().await.unwrap(), WindowHandle::new("window-2"));
        assert_eq!(ctx.context().window, Some(WindowHandle::new("window-2")));
        assert_eq!(driver.clicks_on(&link), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn window_spawn_fails_when_count_stays() {
        let (driver, mut ctx, executor) = setup();
        driver.add_element(
            driver.root(),
            FakeElement::new("dead").matching(By::LinkText("Job Management".into())),
        );
        let step = ActionStep::new("job management", Interaction::Click)
            .on(loc(By::LinkText("Job Management".into())))
            .spawns_window(WindowSpawn {
                timeout_ms: 1_000,
                switch: true,
            })
            .fallback_signal(
                ExpectSpec::new().with_all(Condition::UrlContains("job-management".into())),
            );

        let report = executor.execute_step(&mut ctx, &step).await;
        assert_eq!(report.outcome.failure_kind(), Some(ErrorKind::WindowNotFound));
        assert_eq!(report.phase, StepPhase::InteractionApplied);
        match &report.outcome {
            StepOutcome::Failure { reason, .. } => assert!(reason.contains("1 before, 1 after")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retry_skips_click_when_window_already_opened() {
        let (driver, mut ctx, executor) = setup();
        let link = job_link(&driver, Duration::from_millis(3_000));
        let step = ActionStep::new("job management", Interaction::Click)
            .on(loc(By::LinkText("Job Management".into())))
            .spawns_window(WindowSpawn {
                timeout_ms: 1_000,
                switch: true,
            })
            .retry(RetryPolicy::new(3, 2_500));

        let report = executor.execute_step(&mut ctx, &step).await;
        assert!(report.outcome.is_success(), "{:?}", report.outcome);
        assert_eq!(report.attempts, 2);
        assert_eq!(driver.clicks_on(&link), 1);
        assert_eq!(report.new_window, Some(WindowHandle::new("window-2")));
    }

    #[tokio::test(start_paused = true)]
    async fn script_click_fallback_after_obscured_clicks() {
        let (driver, mut ctx, executor) = setup();
        let tab = driver.add_element(
            driver.root(),
            FakeElement::new("tab")
                .matching(By::Css("div[role='tab']".into()))
                .with_attribute("aria-selected", "false")
                .failing_clicks(10)
                .on_click(ClickEffect::SetAttribute {
                    element: ElementHandle::new("tab"),
                    name: "aria-selected".into(),
                    value: "true".into(),
                }),
        );
        let step = ActionStep::new("ads tab", Interaction::Click)
            .on(loc(By::Css("div[role='tab']".into())))
            .retry(RetryPolicy::new(2, 500).with_fallback(FallbackAction::ScriptClick));

        let report = executor.execute_step(&mut ctx, &step).await;
        assert!(report.outcome.is_success(), "{:?}", report.outcome);
        assert!(report.used_fallback_action);
        assert_eq!(report.attempts, 2);
        assert_eq!(driver.clicks_on(&tab), 2);
        assert_eq!(driver.attribute_of(&tab, "aria-selected").as_deref(), Some("true"));
    }

    #[tokio::test(start_paused = true)]
    async fn script_click_fallback_reaches_disabled_button() {
        let (driver, mut ctx, executor) = setup();
        let go = driver.add_element(
            driver.root(),
            FakeElement::new("go")
                .matching(By::Id("go".into()))
                .with_attribute("data-clicked", "false")
                .disabled()
                .on_click(ClickEffect::SetAttribute {
                    element: ElementHandle::new("go"),
                    name: "data-clicked".into(),
                    value: "true".into(),
                }),
        );
        let step = ActionStep::new("go", Interaction::Click)
            .on(loc(By::Id("go".into())))
            .retry(RetryPolicy::new(2, 100).with_fallback(FallbackAction::ScriptClick));

        let report = executor.execute_step(&mut ctx, &step).await;

        assert!(report.outcome.is_success(), "{:?}", report.outcome);
        assert!(report.used_fallback_action);
        assert_eq!(driver.clicks_on(&go), 0);
        assert!(driver.scripts_run().iter().any(|s| s.contains(".click()")));
        assert_eq!(driver.attribute_of(&go, "data-clicked").as_deref(), Some("true"));
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_signal_confirms_exhausted_step() {
        let (_driver, mut ctx, executor) = setup();
        let step = ActionStep::new("home", Interaction::Click)
            .on(loc(By::Id("home-link".into())))
            .retry(RetryPolicy::new(2, 100))
            .fallback_signal(ExpectSpec::new().with_all(Condition::UrlContains("/home".into())));

        let report = executor.execute_step(&mut ctx, &step).await;
        assert_eq!(
            report.outcome,
            StepOutcome::Success {
                confirmed_by_fallback: true
            }
        );
        assert_eq!(report.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_report_retry_exhausted() {
        let (_driver, mut ctx, executor) = setup();
        let step = ActionStep::new("missing", Interaction::Click)
            .on(loc(By::Id("nope".into())))
            .retry(RetryPolicy::new(2, 100));

        let report = executor.execute_step(&mut ctx, &step).await;
        assert_eq!(report.outcome.failure_kind(), Some(ErrorKind::RetryExhausted));
        assert_eq!(report.attempts, 2);
        assert_eq!(report.phase, StepPhase::ContextEstablished);

        let single = ActionStep::new("missing", Interaction::Click).on(loc(By::Id("nope".into())));
        let report = executor.execute_step(&mut ctx, &single).await;
        assert_eq!(report.outcome.failure_kind(), Some(ErrorKind::ElementNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn session_loss_is_not_retried() {
        let (driver, mut ctx, executor) = setup();
        driver.add_element(
            driver.root(),
            FakeElement::new("btn").matching(By::Id("go".into())),
        );
        driver.lose_session();
        let step = ActionStep::new("go", Interaction::Click)
            .on(loc(By::Id("go".into())))
            .retry(RetryPolicy::new(5, 1_000));

        let report = executor.execute_step(&mut ctx, &step).await;
        assert_eq!(report.outcome.failure_kind(), Some(ErrorKind::SessionLost));
        assert_eq!(report.attempts, 1);
        assert!(report.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn reads_text_inside_frame_and_emits_events() {
        let driver = Arc::new(FakeDriver::new("https://portal.test/home"));
        let inner = driver.add_document();
        driver.add_element(
            driver.root(),
            FakeElement::new("frame")
                .matching(By::Id("iTalentFrame".into()))
                .hosting(inner),
        );
        driver.add_element(
            inner,
            FakeElement::new("count")
                .matching(By::Css(".job-count".into()))
                .with_text(" 12 jobs "),
        );
        let sink = BroadcastSink::new(16);
        let mut events = sink.subscribe();
        let executor = StepExecutor::new(Arc::new(DefaultGateValidator::default()), sink.clone());
        let mut ctx = ContextManager::new(driver.clone(), ContextSettings::default());

        let step = ActionStep::new("count", Interaction::ReadText)
            .in_context(ContextRequirement::frames(vec![loc(By::Id("iTalentFrame".into()))]))
            .on(loc(By::Css(".job-count".into())))
            .settle(500);

        let start = Instant::now();
        let report = executor.execute_step(&mut ctx, &step).await;
        assert_eq!(report.value.as_deref(), Some("12 jobs"));
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(driver.frame_depth(), 1);

        assert_eq!(
            events.try_recv().unwrap(),
            StepEvent::StepStarted {
                step: "count".into()
            }
        );
        assert!(matches!(
            events.try_recv().unwrap(),
            StepEvent::StepSucceeded { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn invalid_step_fails_before_touching_driver() {
        let (driver, mut ctx, executor) = setup();
        let step = ActionStep::new("no locator", Interaction::Click);
        let report = executor.execute_step(&mut ctx, &step).await;
        assert_eq!(report.outcome.failure_kind(), Some(ErrorKind::Invalid));
        assert_eq!(report.phase, StepPhase::Pending);
        assert!(driver.calls().is_empty());
    }
}
