//! webcycle library
//!
//! Configuration model, plan building and the run loop behind the `webcycle`
//! binary. Exposed for integration testing.

pub mod cli;
pub mod config;
pub mod report;
pub mod runner;
pub mod scenario;

pub use config::{Config, ConfigError, Credentials};
pub use report::RunReport;
pub use runner::run_session;
pub use scenario::{build_cycle, build_plan, build_scenario, Plan, PlanOverrides};
