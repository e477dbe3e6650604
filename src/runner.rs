use action_context::ContextManager;
use action_flow::{CyclePlan, FlowError, Scenario, StepExecutor};
use chrono::Utc;
use tracing::{info, warn};
use webcycle_core_types::RunId;

use crate::report::RunReport;

/// Run the scenario, then the cycle when one is given and the scenario
/// succeeded.
pub async fn run_session(
    executor: &StepExecutor,
    ctx: &mut ContextManager,
    scenario: &Scenario,
    cycle: Option<&CyclePlan>,
) -> RunReport {
    let run_id = RunId::new();
    let started_at = Utc::now();
    info!(run_id = %run_id, steps = scenario.steps.len(), "run started");

    let scenario_result = executor.run_scenario(ctx, scenario).await;

    let mut cycle_result = None;
    let mut cycle_error = None;
    match cycle {
        Some(plan) if scenario_result.succeeded() => {
            match executor.run_cycle(ctx, plan).await {
                Ok(result) => cycle_result = Some(result),
                Err(err) => {
                    cycle_error = Some(err.to_string());
                    if let FlowError::CycleAborted { partial, .. } = err {
                        cycle_result = Some(partial);
                    }
                }
            }
        }
        Some(_) => warn!(run_id = %run_id, "scenario failed, cycle skipped"),
        None => {}
    }

    let report = RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        scenario: scenario_result,
        cycle: cycle_result,
        cycle_error,
    };
    info!(
        run_id = %report.run_id,
        succeeded = report.succeeded(),
        "run finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use action_context::{ContextRequirement, ContextSettings};
    use action_flow::ActionStep;
    use action_primitives::{Interaction, Locator, WaitOptions};
    use webcycle_core_types::By;
    use webcycle_driver::{FakeDriver, FakeElement};

    use super::*;

    fn executor() -> StepExecutor {
        StepExecutor::default().with_default_wait(WaitOptions::new(300, 100))
    }

    fn cycle() -> CyclePlan {
        CyclePlan {
            steps: vec![ActionStep::new("refresh", Interaction::Click)
                .on(Locator::single(By::Id("refresh".into())))],
            iterations: 2,
            interval_ms: 1_000,
            context: ContextRequirement::root(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_follows_successful_scenario() {
        let driver = Arc::new(FakeDriver::new("https://portal.test/"));
        let refresh = driver.add_element(
            driver.root(),
            FakeElement::new("refresh").matching(By::Id("refresh".into())),
        );
        let mut ctx = ContextManager::new(driver.clone(), ContextSettings::default());
        let scenario = Scenario::new(
            "login",
            vec![ActionStep::new("first refresh", Interaction::Click)
                .on(Locator::single(By::Id("refresh".into())))],
        );

        let report = run_session(&executor(), &mut ctx, &scenario, Some(&cycle())).await;

        assert!(report.succeeded());
        assert_eq!(report.cycle.unwrap().iterations_completed, 2);
        assert_eq!(driver.clicks_on(&refresh), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_cycle_keeps_earlier_warnings() {
        let driver = Arc::new(FakeDriver::new("https://portal.test/"));
        driver.add_element(
            driver.root(),
            FakeElement::new("refresh").matching(By::Id("refresh".into())),
        );
        let mut ctx = ContextManager::new(driver.clone(), ContextSettings::default());
        let mut plan = cycle();
        plan.iterations = 3;
        plan.steps.push(
            ActionStep::new("confirm", Interaction::Click)
                .on(Locator::single(By::Id("confirm".into()))),
        );
        let scenario = Scenario::new("login", Vec::new());
        // iteration 2 starts after 300ms of "confirm" waiting and the 1s interval
        let browser_gone = async {
            tokio::time::sleep(Duration::from_millis(1_100)).await;
            driver.lose_session();
        };

        let executor = executor();
        let (report, ()) = tokio::join!(
            run_session(&executor, &mut ctx, &scenario, Some(&plan)),
            browser_gone
        );

        assert!(!report.succeeded());
        let cycle = report.cycle.as_ref().unwrap();
        assert_eq!(cycle.iterations_completed, 1);
        assert_eq!(cycle.per_iteration_warnings[0][0].step, "confirm");
        let error = report.cycle_error.as_deref().unwrap();
        assert!(error.contains("iteration 2 after 1 completed"), "{error}");
        let text = report.render_text();
        assert!(text.contains("#1 confirm [element_not_found]"), "{text}");
        assert!(text.contains("cycle: aborted"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_scenario_skips_cycle() {
        let driver = Arc::new(FakeDriver::new("https://portal.test/"));
        let mut ctx = ContextManager::new(driver.clone(), ContextSettings::default());
        let scenario = Scenario::new(
            "login",
            vec![ActionStep::new("submit", Interaction::Click)
                .on(Locator::single(By::Id("submit".into())))],
        );

        let report = run_session(&executor(), &mut ctx, &scenario, Some(&cycle())).await;

        assert!(!report.succeeded());
        assert!(report.cycle.is_none());
        assert!(report.cycle_error.is_none());
    }
}
