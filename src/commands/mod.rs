use crate::cli::{Cli, Commands, ProfileAction};
use crate::Workspace;
use anyhow::Result;

mod add;
mod env;
mod install;
mod profiles;
mod remove;
mod use_profile;

pub fn execute(cli: Cli) -> Result<()> {
    // Create workspace - this is the root entry point
    let mut workspace = Workspace::new(cli.config)?;

    match cli.command {
        Commands::Profile(action) => match action {
            ProfileAction::Add { file } => add::execute(&mut workspace, file),
            ProfileAction::List => profiles::execute(&workspace),
            ProfileAction::Use { name } => use_profile::execute(&mut workspace, name),
            ProfileAction::Remove { names } => remove::execute(&mut workspace, names),
        },

        Commands::Install { threads } => install::execute(&workspace, threads),

        Commands::Env { name, threads } => env::execute(&workspace, name, threads),
    }
}
