//! Configuration file model
//!
//! The YAML file names the target site, credentials, engine timing, named
//! frame paths, the one-off scenario and the repeated cycle.

use std::collections::BTreeMap;
use std::env;
use std::fmt;

use action_context::{ContextSettings, WindowTarget};
use action_flow::{RetryPolicy, WindowSpawn};
use action_gate::ExpectSpec;
use action_primitives::{ActionError, ElementState, Interaction, Locator, WaitOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use webcycle_core_types::By;

/// Frame name that always means the top-level document.
pub const ROOT_FRAME: &str = "root";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{location} refers to unknown frame '{frame}'")]
    UnknownFrame { location: String, frame: String },

    #[error("{location}: {reason}")]
    InvalidLocator { location: String, reason: String },

    #[error("credential missing: {0}")]
    MissingCredential(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Named frame paths, outermost first; each entry is one locator
    #[serde(default)]
    pub frames: BTreeMap<String, Vec<Vec<By>>>,
    #[serde(default)]
    pub scenario: Vec<StepConfig>,
    #[serde(default)]
    pub cycle: Option<CycleConfig>,
    /// Keep the browser open after the run until interrupted
    #[serde(default)]
    pub hold: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Opened before the first scenario step when set
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub window_size: Option<(u32, u32)>,
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: None,
            webdriver_url: default_webdriver_url(),
            headless: false,
            window_size: None,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Environment variable holding the password (e.g. set in config/local.env)
    #[serde(default)]
    pub password_env: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "******"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

/// Values substituted for `{{username}}` and `{{password}}` in step text.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Stand-ins used when printing a plan.
    pub fn masked() -> Self {
        Self {
            username: "{{username}}".to_string(),
            password: "******".to_string(),
        }
    }
}

impl CredentialsConfig {
    /// Inline password first, then the named environment variable.
    pub fn resolve(&self) -> Result<Credentials, ConfigError> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| ConfigError::MissingCredential("credentials.username".to_string()))?;
        let password = match (&self.password, &self.password_env) {
            (Some(password), _) => password.clone(),
            (None, Some(var)) => env::var(var).map_err(|_| {
                ConfigError::MissingCredential(format!("environment variable {}", var))
            })?,
            (None, None) => {
                return Err(ConfigError::MissingCredential(
                    "credentials.password or credentials.password_env".to_string(),
                ))
            }
        };
        Ok(Credentials { username, password })
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some() || self.password.is_some() || self.password_env.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Element wait for steps without their own timeout
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Element that must exist in the top-level document before any frame
    /// descent
    #[serde(default)]
    pub root_anchor: Option<Vec<By>>,
    #[serde(default = "default_anchor_timeout_ms")]
    pub anchor_timeout_ms: u64,
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,
    #[serde(default = "default_window_timeout_ms")]
    pub window_timeout_ms: u64,
    #[serde(default)]
    pub await_ready_state: bool,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_anchor_timeout_ms() -> u64 {
    20_000
}

fn default_frame_timeout_ms() -> u64 {
    15_000
}

fn default_window_timeout_ms() -> u64 {
    10_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_timeout_ms: default_timeout_ms(),
            root_anchor: None,
            anchor_timeout_ms: default_anchor_timeout_ms(),
            frame_timeout_ms: default_frame_timeout_ms(),
            window_timeout_ms: default_window_timeout_ms(),
            await_ready_state: false,
        }
    }
}

impl EngineConfig {
    pub fn default_wait(&self) -> WaitOptions {
        WaitOptions::new(self.default_timeout_ms, self.poll_interval_ms)
    }

    pub fn context_settings(&self) -> Result<ContextSettings, ConfigError> {
        let root_anchor = self
            .root_anchor
            .clone()
            .map(|strategies| locator("engine.root_anchor", strategies))
            .transpose()?;
        Ok(ContextSettings {
            root_anchor,
            anchor_wait: WaitOptions::new(self.anchor_timeout_ms, self.poll_interval_ms),
            frame_wait: WaitOptions::new(self.frame_timeout_ms, self.poll_interval_ms),
            window_wait: WaitOptions::new(self.window_timeout_ms, self.poll_interval_ms),
            await_ready_state: self.await_ready_state,
        })
    }
}

/// One configured step; `frame` names an entry of [`Config::frames`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub window: Option<WindowTarget>,
    #[serde(default)]
    pub locator: Option<Vec<By>>,
    #[serde(default)]
    pub state: Option<ElementState>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    pub interaction: Interaction,
    #[serde(default)]
    pub expect: Option<ExpectSpec>,
    #[serde(default)]
    pub fallback_signal: Option<ExpectSpec>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    #[serde(default)]
    pub best_effort: bool,
    #[serde(default)]
    pub window_spawn: Option<WindowSpawn>,
    #[serde(default)]
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Frame path re-established before every iteration
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    pub steps: Vec<StepConfig>,
}

fn default_iterations() -> u32 {
    3
}

fn default_interval_ms() -> u64 {
    3_000
}

/// One problem found by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    pub location: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Collect every problem instead of stopping at the first.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut issue = |location: String, message: String| {
            issues.push(ConfigIssue { location, message })
        };

        if let Some(reason) = self.engine.root_anchor.as_deref().and_then(locator_problem) {
            issue("engine.root_anchor".into(), reason);
        }
        for (name, path) in &self.frames {
            if name == ROOT_FRAME {
                issue(format!("frames.{}", name), "name is reserved for the top-level document".into());
            }
            for (index, segment) in path.iter().enumerate() {
                if let Some(reason) = locator_problem(segment) {
                    issue(format!("frames.{}[{}]", name, index), reason);
                }
            }
        }

        let cycle_steps = self.cycle.iter().flat_map(|cycle| {
            cycle
                .steps
                .iter()
                .enumerate()
                .map(|(i, step)| (format!("cycle.steps[{}]", i), step))
        });
        let scenario_steps = self
            .scenario
            .iter()
            .enumerate()
            .map(|(i, step)| (format!("scenario[{}]", i), step));

        for (location, step) in scenario_steps.chain(cycle_steps) {
            let location = format!("{} '{}'", location, step.name);
            if let Some(frame) = &step.frame {
                if !self.knows_frame(frame) {
                    issue(location.clone(), format!("unknown frame '{}'", frame));
                }
            }
            match &step.locator {
                Some(strategies) => {
                    if let Some(reason) = locator_problem(strategies) {
                        issue(location.clone(), reason);
                    }
                }
                None if !matches!(
                    step.interaction,
                    Interaction::Navigate { .. } | Interaction::WaitOnly
                ) =>
                {
                    issue(location.clone(), format!("{} needs a locator", step.interaction.name()))
                }
                _ => {}
            }
            if let Some(retry) = &step.retry {
                if retry.max_attempts == 0 {
                    issue(location.clone(), "retry.max_attempts must be at least 1".into());
                }
            }
        }

        if let Some(frame) = self.cycle.as_ref().and_then(|c| c.frame.as_ref()) {
            if !self.knows_frame(frame) {
                issue("cycle.frame".into(), format!("unknown frame '{}'", frame));
            }
        }

        if crate::scenario::needs_credentials(self) && !self.credentials.is_configured() {
            issue(
                "credentials".into(),
                "steps use {{username}}/{{password}} but no credentials are configured".into(),
            );
        }

        issues
    }

    pub fn knows_frame(&self, name: &str) -> bool {
        name == ROOT_FRAME || self.frames.contains_key(name)
    }

    /// Frame path for `name`, outermost first; `location` names the
    /// referring entry in errors.
    pub fn frame_path(&self, location: &str, name: &str) -> Result<Vec<Locator>, ConfigError> {
        if name == ROOT_FRAME {
            return Ok(Vec::new());
        }
        let segments = self.frames.get(name).ok_or_else(|| ConfigError::UnknownFrame {
            location: location.to_string(),
            frame: name.to_string(),
        })?;
        segments
            .iter()
            .enumerate()
            .map(|(index, strategies)| {
                locator(&format!("frames.{}[{}]", name, index), strategies.clone())
            })
            .collect()
    }
}

pub(crate) fn locator(location: &str, strategies: Vec<By>) -> Result<Locator, ConfigError> {
    Locator::new(strategies).map_err(|err| ConfigError::InvalidLocator {
        location: location.to_string(),
        reason: locator_reason(err),
    })
}

fn locator_problem(strategies: &[By]) -> Option<String> {
    Locator::new(strategies.to_vec()).err().map(locator_reason)
}

fn locator_reason(err: ActionError) -> String {
    match err {
        ActionError::Invalid(reason) => reason,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
target:
  url: https://portal.example.com/
credentials:
  username: someone@example.com
  password_env: WEBCYCLE_TEST_PASSWORD_UNSET
engine:
  root_anchor:
    - id: convoy-container
frames:
  job:
    - - id: iTalentFrame
      - tag_name: iframe
scenario:
  - name: username
    locator:
      - css: "input#form-item-account"
    interaction:
      action: type
      text: "{{username}}"
  - name: bogus
    frame: nowhere
    locator: []
    interaction:
      action: click
    retry:
      max_attempts: 0
cycle:
  frame: job
  steps:
    - name: refresh
      locator:
        - xpath: "//div[text()='Refresh']"
      interaction:
        action: click
"#;

    #[test]
    fn parses_with_defaults() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.target.webdriver_url, "http://localhost:9515");
        assert_eq!(config.engine.poll_interval_ms, 250);
        let cycle = config.cycle.as_ref().unwrap();
        assert_eq!(cycle.iterations, 3);
        assert_eq!(cycle.interval_ms, 3_000);
        assert_eq!(config.frame_path("cycle", "job").unwrap().len(), 1);
        assert!(config.frame_path("cycle", ROOT_FRAME).unwrap().is_empty());
        assert!(matches!(
            config.frame_path("scenario[1]", "nowhere"),
            Err(ConfigError::UnknownFrame { .. })
        ));
    }

    #[test]
    fn validate_reports_every_problem() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let issues = config.validate();
        let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        assert_eq!(issues.len(), 3, "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("unknown frame 'nowhere'")));
        assert!(messages.iter().any(|m| m.contains("locator needs at least one strategy")));
        assert!(messages.iter().any(|m| m.contains("max_attempts")));
    }

    #[test]
    fn compound_class_name_is_reported() {
        let yaml = r#"
target:
  url: https://portal.example.com/
frames:
  job:
    - - class_name: "main frame"
scenario:
  - name: ok
    frame: job
    locator:
      - class_name: "ok btn"
    interaction:
      action: click
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let issues = config.validate();
        assert_eq!(issues.len(), 2, "{issues:?}");
        assert!(issues.iter().all(|i| i.message.contains("single class")));
        assert!(matches!(
            config.frame_path("scenario[0]", "job"),
            Err(ConfigError::InvalidLocator { ref location, .. }) if location == "frames.job[0]"
        ));
    }

    #[test]
    fn password_from_environment() {
        let creds = CredentialsConfig {
            username: Some("someone".into()),
            password: None,
            password_env: Some("WEBCYCLE_TEST_PASSWORD_SET".into()),
        };
        env::set_var("WEBCYCLE_TEST_PASSWORD_SET", "s3cret");
        assert_eq!(creds.resolve().unwrap().password, "s3cret");

        let missing = CredentialsConfig {
            password_env: Some("WEBCYCLE_TEST_PASSWORD_UNSET".into()),
            ..creds
        };
        assert!(matches!(missing.resolve(), Err(ConfigError::MissingCredential(_))));
        assert!(!format!("{:?}", CredentialsConfig {
            password: Some("hunter2".into()),
            ..CredentialsConfig::default()
        })
        .contains("hunter2"));
    }

    #[test]
    fn engine_builds_context_settings() {
        let engine = EngineConfig {
            root_anchor: Some(vec![By::Id("convoy-container".into())]),
            await_ready_state: true,
            ..EngineConfig::default()
        };
        let settings = engine.context_settings().unwrap();
        assert!(settings.root_anchor.is_some());
        assert_eq!(settings.frame_wait.timeout_ms, 15_000);
        assert_eq!(settings.frame_wait.poll_interval_ms, 250);

        let empty = EngineConfig {
            root_anchor: Some(Vec::new()),
            ..EngineConfig::default()
        };
        assert!(matches!(
            empty.context_settings(),
            Err(ConfigError::InvalidLocator { .. })
        ));
    }
}
