use anyhow::Result;

use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::run::cmd_run;
use super::show::cmd_show;
use super::validate::cmd_validate;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Validate => cmd_validate(ctx),
        Commands::Show => cmd_show(ctx),
    }
}
