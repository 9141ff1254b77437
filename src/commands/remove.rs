use crate::{ui, Workspace};
use anyhow::Result;

pub fn execute(workspace: &mut Workspace, names: Vec<String>) -> Result<()> {
    let mut missing = Vec::new();
    for name in names {
        match workspace.store_mut().remove_profile(&name) {
            Ok(()) => ui::success("Removed", format!("profile '{name}'")),
            Err(err) => {
                ui::error(&err);
                missing.push(name);
            }
        }
    }

    if !missing.is_empty() {
        anyhow::bail!(
            "Failed to remove {} profile(s): {}. Use 'raid profile list' to see available profiles.",
            missing.len(),
            missing.join(", ")
        );
    }
    Ok(())
}
