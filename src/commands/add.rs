use crate::{ui, Workspace};
use anyhow::Result;
use std::path::PathBuf;

pub fn execute(workspace: &mut Workspace, file: PathBuf) -> Result<()> {
    let (profiles, activated) = workspace.add_profiles(&file)?;

    for profile in &profiles {
        ui::success("Added", format!("profile '{}' from {}", profile.name, file.display()));
    }
    if activated {
        if let Some(first) = profiles.first() {
            ui::success("Active", format!("profile '{}'", first.name));
        }
    }
    Ok(())
}
