//! Timed repetition of a step batch

use action_context::ContextManager;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::errors::FlowError;
use crate::events::StepEvent;
use crate::executor::StepExecutor;
use crate::types::{CyclePlan, CycleResult, StepOutcome, StepWarning};

impl StepExecutor {
    /// Run `plan.iterations` rounds of: re-establish the plan context, run
    /// every step best-effort, sleep the interval.
    ///
    /// Session loss or a context that cannot be re-established aborts with
    /// [`FlowError::CycleAborted`], which carries the iterations completed so
    /// far.
    pub async fn run_cycle(
        &self,
        ctx: &mut ContextManager,
        plan: &CyclePlan,
    ) -> Result<CycleResult, FlowError> {
        plan.validate()?;
        let mut result = CycleResult::default();
        info!(
            iterations = plan.iterations,
            interval_ms = plan.interval_ms,
            steps = plan.steps.len(),
            "cycle started"
        );

        for iteration in 1..=plan.iterations {
            self.sink().emit(StepEvent::IterationStarted { iteration });

            if let Err(err) = ctx.establish_with_recovery(&plan.context).await {
                return Err(self.abort(iteration, result, err.into()));
            }

            let mut warnings = Vec::new();
            for step in &plan.steps {
                let (report, error) = self.run_step(ctx, step).await;
                let StepOutcome::Failure { kind, reason } = report.outcome else {
                    continue;
                };
                if kind.is_fatal() {
                    let err = error.unwrap_or(FlowError::Invalid(reason));
                    return Err(self.abort(iteration, result, err));
                }
                warnings.push(StepWarning {
                    step: report.step,
                    kind,
                    message: reason,
                });
            }

            self.sink().emit(StepEvent::IterationCompleted {
                iteration,
                warnings: warnings.len(),
            });
            result.iterations_completed = iteration;
            result.per_iteration_warnings.push(warnings);

            sleep(plan.interval()).await;
        }

        info!(
            iterations = result.iterations_completed,
            warnings = result.warning_count(),
            "cycle finished"
        );
        Ok(result)
    }

    fn abort(&self, iteration: u32, partial: CycleResult, err: FlowError) -> FlowError {
        warn!(iteration, error = %err, "cycle aborted");
        self.sink().emit(StepEvent::CycleAborted {
            iteration,
            kind: err.kind(),
        });
        FlowError::CycleAborted {
            iteration,
            partial,
            source: Box::new(err),
        }
    }
}
