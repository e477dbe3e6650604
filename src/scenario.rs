//! Turn configured steps into engine steps

use action_context::ContextRequirement;
use action_flow::{ActionStep, CyclePlan, Scenario};
use action_primitives::{Interaction, WaitOptions};
use serde::Serialize;

use crate::config::{locator, Config, ConfigError, Credentials, StepConfig};

const USERNAME_PLACEHOLDER: &str = "{{username}}";
const PASSWORD_PLACEHOLDER: &str = "{{password}}";

/// Overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct PlanOverrides {
    pub iterations: Option<u32>,
    pub interval_ms: Option<u64>,
}

/// Everything `run` executes, in order.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub scenario: Scenario,
    pub cycle: Option<CyclePlan>,
}

pub fn build_plan(
    config: &Config,
    credentials: &Credentials,
    overrides: &PlanOverrides,
) -> Result<Plan, ConfigError> {
    Ok(Plan {
        scenario: build_scenario(config, credentials)?,
        cycle: build_cycle(config, credentials, overrides)?,
    })
}

/// Build the one-off scenario; a configured target URL becomes a leading
/// navigate step.
pub fn build_scenario(config: &Config, credentials: &Credentials) -> Result<Scenario, ConfigError> {
    let mut steps = Vec::with_capacity(config.scenario.len() + 1);
    if let Some(url) = &config.target.url {
        steps.push(ActionStep::new(
            "open target",
            Interaction::Navigate { url: url.clone() },
        ));
    }
    for (index, step) in config.scenario.iter().enumerate() {
        let location = format!("scenario[{}] '{}'", index, step.name);
        steps.push(build_step(config, &location, step, credentials)?);
    }
    Ok(Scenario::new("scenario", steps))
}

/// Build the refresh cycle, if one is configured.
pub fn build_cycle(
    config: &Config,
    credentials: &Credentials,
    overrides: &PlanOverrides,
) -> Result<Option<CyclePlan>, ConfigError> {
    let Some(cycle) = &config.cycle else {
        return Ok(None);
    };
    let context = match &cycle.frame {
        Some(frame) => ContextRequirement::frames(config.frame_path("cycle.frame", frame)?),
        None => ContextRequirement::root(),
    };
    let steps = cycle
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let location = format!("cycle.steps[{}] '{}'", index, step.name);
            build_step(config, &location, step, credentials)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(CyclePlan {
        steps,
        iterations: overrides.iterations.unwrap_or(cycle.iterations),
        interval_ms: overrides.interval_ms.unwrap_or(cycle.interval_ms),
        context,
    }))
}

/// Whether any step text refers to the credentials.
pub fn needs_credentials(config: &Config) -> bool {
    config
        .scenario
        .iter()
        .chain(config.cycle.iter().flat_map(|cycle| cycle.steps.iter()))
        .any(|step| match &step.interaction {
            Interaction::Type { text, .. } => {
                text.contains(USERNAME_PLACEHOLDER) || text.contains(PASSWORD_PLACEHOLDER)
            }
            _ => false,
        })
}

fn build_step(
    config: &Config,
    location: &str,
    step: &StepConfig,
    credentials: &Credentials,
) -> Result<ActionStep, ConfigError> {
    let frames = step
        .frame
        .as_deref()
        .map(|frame| config.frame_path(location, frame))
        .transpose()?;
    let context = match (frames, &step.window) {
        (None, None) => None,
        (frames, window) => Some(ContextRequirement {
            window: window.clone(),
            frames: frames.unwrap_or_default(),
        }),
    };

    let locator = step
        .locator
        .clone()
        .map(|strategies| locator(location, strategies))
        .transpose()?;
    let wait = step
        .timeout_ms
        .map(|timeout_ms| WaitOptions::new(timeout_ms, config.engine.poll_interval_ms));

    let built = ActionStep {
        name: step.name.clone(),
        context,
        locator,
        state: step.state,
        wait,
        interaction: substitute(&step.interaction, credentials),
        expect: step.expect.clone(),
        fallback_signal: step.fallback_signal.clone(),
        retry: step.retry.clone(),
        best_effort: step.best_effort,
        window_spawn: step.window_spawn,
        settle_ms: step.settle_ms,
    };
    built
        .validate()
        .map_err(|err| ConfigError::Invalid(format!("{}: {}", location, err)))?;
    Ok(built)
}

fn substitute(interaction: &Interaction, credentials: &Credentials) -> Interaction {
    match interaction {
        Interaction::Type { text, clear } => Interaction::Type {
            text: text
                .replace(USERNAME_PLACEHOLDER, &credentials.username)
                .replace(PASSWORD_PLACEHOLDER, &credentials.password),
            clear: *clear,
        },
        other => other.clone(),
    }
}
