use crate::{ui, Workspace};
use anyhow::Result;

pub fn execute(workspace: &Workspace) -> Result<()> {
    let store = workspace.store();
    if store.profiles().is_empty() {
        ui::info("No profiles found. Use 'raid profile add <file>' to add one.");
        return Ok(());
    }

    let active = store.active_profile();
    for (name, source) in store.profiles() {
        if Some(name.as_str()) == active {
            println!("* {name} (active)\n    File: {}", source.display());
        } else {
            println!("  {name}\n    File: {}", source.display());
        }
    }
    Ok(())
}
