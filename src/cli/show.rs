use std::fmt::Write as _;

use action_flow::ActionStep;
use anyhow::{Context, Result};

use crate::config::Credentials;
use crate::scenario::{build_plan, Plan, PlanOverrides};

use super::context::CliContext;
use super::output::emit;

/// Print the plan with credentials masked.
pub fn cmd_show(ctx: &CliContext) -> Result<()> {
    let plan = build_plan(ctx.config(), &Credentials::masked(), &PlanOverrides::default())
        .context("Failed to build plan from configuration")?;
    emit(ctx.output(), &plan, || render_plan(&plan))
}

fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "scenario ({} steps)", plan.scenario.steps.len());
    for (index, step) in plan.scenario.steps.iter().enumerate() {
        render_step(&mut out, index, step);
    }
    if let Some(cycle) = &plan.cycle {
        let _ = writeln!(
            out,
            "cycle ({} steps, {} iterations, every {}ms, {} frame level(s))",
            cycle.steps.len(),
            cycle.iterations,
            cycle.interval_ms,
            cycle.context.frames.len()
        );
        for (index, step) in cycle.steps.iter().enumerate() {
            render_step(&mut out, index, step);
        }
    }
    out
}

fn render_step(out: &mut String, index: usize, step: &ActionStep) {
    let _ = write!(out, "  {:>2}. {:<28} {}", index + 1, step.name, step.interaction.name());
    if let Some(locator) = &step.locator {
        let _ = write!(out, " {}", locator);
    }
    if let Some(context) = &step.context {
        if let Some(window) = &context.window {
            let _ = write!(out, " window={}", window);
        }
        if !context.frames.is_empty() {
            let _ = write!(out, " frames={}", context.frames.len());
        }
    }
    if step.best_effort {
        out.push_str(" best-effort");
    }
    if step.window_spawn.is_some() {
        out.push_str(" spawns-window");
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn renders_steps_without_secrets() {
        let config = Config::from_yaml(
            r#"
credentials:
  username: someone@example.com
  password: hunter2
scenario:
  - name: password
    locator:
      - id: password
    interaction:
      action: type
      text: "{{password}}"
  - name: submit
    best_effort: true
    locator:
      - css: button.login
    interaction:
      action: click
"#,
        )
        .unwrap();
        let plan = build_plan(&config, &Credentials::masked(), &PlanOverrides::default()).unwrap();
        let text = render_plan(&plan);

        assert!(text.starts_with("scenario (2 steps)"));
        assert!(text.contains("submit"));
        assert!(text.contains("best-effort"));
        assert!(!text.contains("hunter2"));
        let json = serde_json::to_string(&plan).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
