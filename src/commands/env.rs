use crate::environment::resolve_required;
use crate::executor::EnvironmentExecutor;
use crate::{ui, Workspace};
use anyhow::{Context, Result};

pub fn execute(workspace: &Workspace, name: String, threads: usize) -> Result<()> {
    let profile = workspace.active_profile()?;
    ui::status(
        "Executing",
        format!("environment '{name}' for profile '{}'", profile.name),
    );

    let matches = resolve_required(&profile, &name)?;
    let count = matches.len();
    EnvironmentExecutor::new(threads)
        .execute(matches)
        .with_context(|| format!("Failed to execute environment '{name}'"))?;

    ui::success(
        "Finished",
        format!("environment '{name}' ({count} declaration(s))"),
    );
    Ok(())
}
