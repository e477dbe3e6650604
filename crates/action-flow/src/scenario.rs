//! Ordered scenario execution

use action_context::ContextManager;
use tracing::{error, info, warn};

use crate::executor::StepExecutor;
use crate::types::{Scenario, ScenarioFailure, ScenarioResult, StepOutcome, StepWarning};

impl StepExecutor {
    /// Run the steps in order. A failed mandatory step, or any fatal
    /// failure, ends the scenario; best-effort failures become warnings.
    pub async fn run_scenario(
        &self,
        ctx: &mut ContextManager,
        scenario: &Scenario,
    ) -> ScenarioResult {
        info!(scenario = %scenario.name, steps = scenario.steps.len(), "scenario started");
        let mut result = ScenarioResult::default();

        for step in &scenario.steps {
            let report = self.execute_step(ctx, step).await;
            let aborts = report.aborts_scenario();
            match &report.outcome {
                StepOutcome::Success { .. } => result.completed_steps += 1,
                StepOutcome::Failure { kind, reason } if aborts => {
                    let diagnostics = ctx.diagnostics().await;
                    error!(
                        scenario = %scenario.name,
                        step = %step.name,
                        kind = kind.name(),
                        %diagnostics,
                        "scenario aborted"
                    );
                    result.failure = Some(ScenarioFailure {
                        step: step.name.clone(),
                        kind: *kind,
                        message: reason.clone(),
                        diagnostics,
                    });
                    result.reports.push(report);
                    return result;
                }
                StepOutcome::Failure { kind, reason } => {
                    warn!(step = %step.name, kind = kind.name(), "best-effort step failed");
                    result.warnings.push(StepWarning {
                        step: step.name.clone(),
                        kind: *kind,
                        message: reason.clone(),
                    });
                }
            }
            result.reports.push(report);
        }

        info!(
            scenario = %scenario.name,
            completed = result.completed_steps,
            warnings = result.warnings.len(),
            "scenario finished"
        );
        result
    }
}
