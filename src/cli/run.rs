use std::sync::Arc;

use action_context::ContextManager;
use action_flow::StepExecutor;
use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};
use webcycle_driver::BrowserDriver;

use crate::config::{Config, Credentials};
use crate::runner::run_session;
use crate::scenario::{build_plan, needs_credentials, PlanOverrides};

use super::context::CliContext;
use super::output::emit;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Number of cycle iterations (overrides the config)
    #[arg(long)]
    pub cycles: Option<u32>,

    /// Pause between cycle iterations in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// WebDriver endpoint (overrides target.webdriver_url)
    #[arg(long, value_name = "URL")]
    pub webdriver: Option<String>,

    /// Run the browser headless
    #[arg(long)]
    pub headless: bool,

    /// Keep the browser open after the run until Ctrl-C
    #[arg(long)]
    pub hold: bool,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            warn!(%issue, "configuration issue");
        }
        bail!(
            "configuration has {} issue(s); run `webcycle validate` for details",
            issues.len()
        );
    }

    let credentials = if needs_credentials(config) {
        config
            .credentials
            .resolve()
            .context("Failed to resolve credentials")?
    } else {
        Credentials::masked()
    };
    let overrides = PlanOverrides {
        iterations: args.cycles,
        interval_ms: args.interval_ms,
    };
    let plan = build_plan(config, &credentials, &overrides)?;
    let settings = config.engine.context_settings()?;

    let driver = connect(config, &args).await?;
    let mut manager = ContextManager::new(driver.clone(), settings);
    let executor = StepExecutor::default().with_default_wait(config.engine.default_wait());

    let report = run_session(&executor, &mut manager, &plan.scenario, plan.cycle.as_ref()).await;
    emit(ctx.output(), &report, || report.render_text())?;

    if args.hold || config.hold {
        info!("Holding browser session open; press Ctrl-C to close");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
    }
    if let Err(err) = driver.close().await {
        warn!(%err, "failed to close browser session");
    }

    if !report.succeeded() {
        bail!("run {} did not complete", report.run_id);
    }
    Ok(())
}

#[cfg(feature = "webdriver")]
async fn connect(config: &Config, args: &RunArgs) -> Result<Arc<dyn BrowserDriver>> {
    use webcycle_driver::{WebDriverOptions, WebDriverSession};

    let options = WebDriverOptions {
        url: args
            .webdriver
            .clone()
            .unwrap_or_else(|| config.target.webdriver_url.clone()),
        headless: args.headless || config.target.headless,
        window_size: config.target.window_size,
    };
    info!(url = %options.url, headless = options.headless, "Connecting to WebDriver");
    let session = WebDriverSession::connect(&options)
        .await
        .with_context(|| format!("Failed to connect to WebDriver at {}", options.url))?;
    Ok(Arc::new(session))
}

#[cfg(not(feature = "webdriver"))]
async fn connect(_config: &Config, _args: &RunArgs) -> Result<Arc<dyn BrowserDriver>> {
    bail!("webcycle was built without the `webdriver` feature; no browser backend available")
}
