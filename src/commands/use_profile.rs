use crate::Workspace;
use anyhow::Result;

pub fn execute(workspace: &mut Workspace, profile: String) -> Result<()> {
    workspace.store_mut().set_active_profile(&profile)?;
    println!("Profile '{}' is now active.", profile);
    Ok(())
}
