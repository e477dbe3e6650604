//! Run report printed by `webcycle run`

use std::fmt::Write as _;

use action_flow::{CycleResult, ScenarioResult, StepOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use webcycle_core_types::RunId;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scenario: ScenarioResult,
    /// Absent when no cycle is configured or the scenario failed; after an
    /// abort it holds the iterations finished before `cycle_error`
    pub cycle: Option<CycleResult>,
    pub cycle_error: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.scenario.succeeded() && self.cycle_error.is_none()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let elapsed = self.finished_at - self.started_at;
        let _ = writeln!(out, "run {} ({}s)", self.run_id, elapsed.num_seconds());

        let total = self.scenario.reports.len();
        let _ = writeln!(
            out,
            "scenario: {} completed, {} warning(s), {} step(s) run",
            self.scenario.completed_steps,
            self.scenario.warnings.len(),
            total
        );
        for report in &self.scenario.reports {
            let status = match &report.outcome {
                StepOutcome::Success {
                    confirmed_by_fallback: true,
                } => "ok (fallback signal)".to_string(),
                StepOutcome::Success { .. } if report.used_fallback_action => {
                    "ok (fallback action)".to_string()
                }
                StepOutcome::Success { .. } => "ok".to_string(),
                StepOutcome::Failure { kind, .. } if report.best_effort => {
                    format!("warn {}", kind.name())
                }
                StepOutcome::Failure { kind, .. } => format!("FAIL {}", kind.name()),
            };
            let _ = write!(
                out,
                "  {:<28} {:<24} attempts={} {}ms",
                report.step, status, report.attempts, report.latency_ms
            );
            if let Some(value) = &report.value {
                let _ = write!(out, " value={:?}", value);
            }
            if let Some(window) = &report.new_window {
                let _ = write!(out, " window={}", window);
            }
            out.push('\n');
        }
        if let Some(failure) = &self.scenario.failure {
            let _ = writeln!(
                out,
                "failed at '{}' [{}]: {}",
                failure.step,
                failure.kind.name(),
                failure.message
            );
            let _ = writeln!(out, "  {}", failure.diagnostics);
        }

        if let Some(cycle) = &self.cycle {
            let _ = writeln!(
                out,
                "cycle: {} iteration(s) completed, {} warning(s)",
                cycle.iterations_completed,
                cycle.warning_count()
            );
            for (index, warnings) in cycle.per_iteration_warnings.iter().enumerate() {
                for warning in warnings {
                    let _ = writeln!(
                        out,
                        "  #{} {} [{}]: {}",
                        index + 1,
                        warning.step,
                        warning.kind.name(),
                        warning.message
                    );
                }
            }
        }
        if let Some(error) = &self.cycle_error {
            let _ = writeln!(out, "cycle: aborted: {}", error);
        }
        out
    }
}
