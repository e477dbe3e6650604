use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::{ConfigIssue, Credentials};
use crate::scenario::{build_plan, PlanOverrides};

use super::context::CliContext;
use super::output::emit;

#[derive(Serialize)]
struct ValidationReport {
    config: String,
    valid: bool,
    issues: Vec<ConfigIssue>,
}

pub fn cmd_validate(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let mut issues = config.validate();
    if issues.is_empty() {
        // step-level checks only run on a structurally sound config
        if let Err(err) = build_plan(config, &Credentials::masked(), &PlanOverrides::default()) {
            issues.push(ConfigIssue {
                location: "plan".to_string(),
                message: err.to_string(),
            });
        }
    }

    let report = ValidationReport {
        config: ctx.config_path().display().to_string(),
        valid: issues.is_empty(),
        issues,
    };
    emit(ctx.output(), &report, || {
        let mut text = String::new();
        if report.valid {
            text.push_str(&format!("{}: ok\n", report.config));
        } else {
            text.push_str(&format!("{}: {} issue(s)\n", report.config, report.issues.len()));
            for issue in &report.issues {
                text.push_str(&format!("  {}\n", issue));
            }
        }
        text
    })?;

    if !report.valid {
        bail!("configuration has {} issue(s)", report.issues.len());
    }
    Ok(())
}
