use crate::installers::{ConcurrentInstaller, InstallOutcome};
use crate::{ui, Workspace};
use anyhow::{Context, Result};

pub fn execute(workspace: &Workspace, threads: usize) -> Result<()> {
    let profile = workspace.active_profile()?;
    ui::status(
        "Installing",
        format!(
            "profile '{}' with {} repositories",
            profile.name,
            profile.repositories.len()
        ),
    );

    let report = ConcurrentInstaller::new(threads)
        .install(&profile)
        .with_context(|| format!("Installation of profile '{}' failed", profile.name))?;

    let cloned = report.count(|outcome| matches!(outcome, InstallOutcome::Cloned));
    let skipped = report.count(|outcome| matches!(outcome, InstallOutcome::Skipped));
    ui::success(
        "Installed",
        format!("profile '{}' ({cloned} cloned, {skipped} already present)", profile.name),
    );
    Ok(())
}
