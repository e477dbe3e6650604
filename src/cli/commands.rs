use clap::Subcommand;

use super::run::RunArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the configured scenario, then the refresh cycle
    Run(RunArgs),

    /// Check the configuration without starting a browser
    Validate,

    /// Print the step plan built from the configuration
    Show,
}
