//! Config file to finished run, against the in-memory driver.

use std::sync::Arc;
use std::time::Duration;

use action_context::ContextManager;
use action_flow::StepExecutor;
use webcycle::{build_plan, run_session, Config, PlanOverrides};
use webcycle_core_types::{By, ElementHandle, ErrorKind, WindowHandle};
use webcycle_driver::{ClickEffect, FakeDriver, FakeElement};

const CONFIG: &str = r#"
target:
  url: https://portal.test/login
credentials:
  username: someone@example.com
  password_env: WEBCYCLE_E2E_PASSWORD
engine:
  poll_interval_ms: 100
  default_timeout_ms: 1000
  frame_timeout_ms: 1000
  window_timeout_ms: 2000
frames:
  job:
    - - id: iTalentFrame
      - tag_name: iframe
scenario:
  - name: username
    locator:
      - css: "input#account"
    interaction:
      action: type
      text: "{{username}}"
  - name: password
    locator:
      - css: "input#password"
    interaction:
      action: type
      text: "{{password}}"
  - name: terms
    locator:
      - css: "span.checkbox"
    interaction:
      action: ensure_checked
  - name: sign in
    locator:
      - css: "button.login"
    interaction:
      action: click
    expect:
      timeout_ms: 1000
      all:
        - element_visible:
            - id: convoy-container
  - name: open jobs
    locator:
      - link_text: Jobs
    interaction:
      action: click
    window_spawn:
      timeout_ms: 2000
  - name: ads tab
    frame: job
    locator:
      - xpath: "//div[@class='tab']"
    interaction:
      action: click
cycle:
  frame: job
  iterations: 2
  interval_ms: 1000
  steps:
    - name: refresh
      locator:
        - id: refresh
      interaction:
        action: click
    - name: confirm
      best_effort: true
      locator:
        - id: confirm
      interaction:
        action: click
"#;

struct Portal {
    driver: Arc<FakeDriver>,
    password: ElementHandle,
    terms: ElementHandle,
    tab: ElementHandle,
    refresh: ElementHandle,
}

fn portal() -> Portal {
    let driver = Arc::new(FakeDriver::new("about:blank"));
    let root = driver.root();
    let jobs = driver.add_document();
    let inner = driver.add_document();

    driver.add_element(
        root,
        FakeElement::new("account").matching(By::Css("input#account".into())),
    );
    let password = driver.add_element(
        root,
        FakeElement::new("password").matching(By::Css("input#password".into())),
    );
    let terms = driver.add_element(
        root,
        FakeElement::new("terms")
            .matching(By::Css("span.checkbox".into()))
            .with_attribute("class", "checkbox")
            .on_click(ClickEffect::SetAttribute {
                element: ElementHandle::new("terms"),
                name: "class".into(),
                value: "checkbox checked".into(),
            }),
    );
    let shell = driver.add_element(
        root,
        FakeElement::new("shell")
            .matching(By::Id("convoy-container".into()))
            .hidden(),
    );
    driver.add_element(
        root,
        FakeElement::new("login")
            .matching(By::Css("button.login".into()))
            .on_click(ClickEffect::SetDisplayed {
                element: shell,
                displayed: true,
            }),
    );
    driver.add_element(
        root,
        FakeElement::new("jobs-link")
            .matching(By::LinkText("Jobs".into()))
            .on_click(ClickEffect::OpenWindow {
                document: jobs,
                url: "https://portal.test/jobs".into(),
                delay: Duration::from_millis(400),
            }),
    );

    driver.add_element(
        jobs,
        FakeElement::new("job-frame")
            .matching(By::TagName("iframe".into()))
            .hosting(inner),
    );
    let tab = driver.add_element(
        inner,
        FakeElement::new("tab")
            .matching(By::XPath("//div[@class='tab']".into()))
            .appearing_after(Duration::from_millis(300)),
    );
    let refresh = driver.add_element(
        inner,
        FakeElement::new("refresh").matching(By::Id("refresh".into())),
    );

    Portal {
        driver,
        password,
        terms,
        tab,
        refresh,
    }
}

#[tokio::test(start_paused = true)]
async fn configured_run_completes_against_fake_portal() {
    std::env::set_var("WEBCYCLE_E2E_PASSWORD", "e2e-secret");
    let config = Config::from_yaml(CONFIG).unwrap();
    assert!(config.validate().is_empty());

    let credentials = config.credentials.resolve().unwrap();
    let plan = build_plan(&config, &credentials, &PlanOverrides::default()).unwrap();
    assert_eq!(plan.scenario.steps.len(), 7);

    let portal = portal();
    let mut ctx = ContextManager::new(
        portal.driver.clone(),
        config.engine.context_settings().unwrap(),
    );
    let executor = StepExecutor::default().with_default_wait(config.engine.default_wait());

    let report = run_session(&executor, &mut ctx, &plan.scenario, plan.cycle.as_ref()).await;

    assert!(report.succeeded(), "{}", report.render_text());
    assert_eq!(report.scenario.completed_steps, 7);
    assert_eq!(
        portal.driver.attribute_of(&portal.password, "value").as_deref(),
        Some("e2e-secret")
    );
    assert_eq!(portal.driver.clicks_on(&portal.terms), 1);
    assert_eq!(
        report.scenario.reports[5].new_window,
        Some(WindowHandle::new("window-2"))
    );
    assert_eq!(portal.driver.clicks_on(&portal.tab), 1);

    let cycle = report.cycle.as_ref().unwrap();
    assert_eq!(cycle.iterations_completed, 2);
    assert_eq!(cycle.warning_count(), 2);
    assert!(cycle
        .per_iteration_warnings
        .iter()
        .all(|warnings| warnings[0].kind == ErrorKind::ElementNotFound));
    assert_eq!(portal.driver.clicks_on(&portal.refresh), 2);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"iterations_completed\":2"));
}

#[tokio::test(start_paused = true)]
async fn lost_session_stops_the_run() {
    std::env::set_var("WEBCYCLE_E2E_PASSWORD", "e2e-secret");
    let config = Config::from_yaml(CONFIG).unwrap();
    let credentials = config.credentials.resolve().unwrap();
    let plan = build_plan(&config, &credentials, &PlanOverrides::default()).unwrap();

    let portal = portal();
    portal.driver.lose_session();
    let mut ctx = ContextManager::new(
        portal.driver.clone(),
        config.engine.context_settings().unwrap(),
    );
    let executor = StepExecutor::default().with_default_wait(config.engine.default_wait());

    let report = run_session(&executor, &mut ctx, &plan.scenario, plan.cycle.as_ref()).await;

    let failure = report.scenario.failure.as_ref().unwrap();
    assert_eq!(failure.step, "open target");
    assert_eq!(failure.kind, ErrorKind::SessionLost);
    assert!(report.cycle.is_none());
}
