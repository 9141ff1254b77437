use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::RaidError;
use crate::profile::{read_profiles, Profile};
use crate::store::ProfileStore;
use crate::util::path::home_dir;

/// Directory under `$HOME` holding raid state.
const CONFIG_DIR_NAME: &str = ".raid";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Workspace path types
#[derive(Debug, Clone, Copy)]
pub enum WorkspacePath {
    /// Config directory: $HOME/.raid (or the parent of an explicit config file)
    Root,
    /// Config file: $HOME/.raid/config.toml
    ConfigFile,
}

/// Workspace - the configuration handle every command works through
///
/// Built once at startup from the resolved config path and passed by
/// reference; nothing reads the store through global state.
#[derive(Debug)]
pub struct Workspace {
    config_path: PathBuf,
    store: ProfileStore,
}

impl Workspace {
    /// Open the workspace at `config_path`, or at `$HOME/.raid/config.toml`.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        let store = ProfileStore::load(&config_path)
            .with_context(|| format!("Failed to load config file {:?}", config_path))?;

        Ok(Self { config_path, store })
    }

    fn default_config_path() -> Result<PathBuf> {
        let home = home_dir().context("Could not determine home directory")?;
        Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Get path for a specific workspace location
    pub fn path(&self, path_type: WorkspacePath) -> PathBuf {
        match path_type {
            WorkspacePath::Root => self
                .config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            WorkspacePath::ConfigFile => self.config_path.clone(),
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProfileStore {
        &mut self.store
    }

    /// Parse profile file `source` and register every profile it declares.
    ///
    /// Returns the added profiles and whether the first one became active.
    pub fn add_profiles(&mut self, source: &Path) -> Result<(Vec<Profile>, bool)> {
        if !source.exists() {
            return Err(RaidError::NotFound(format!("file {:?} does not exist", source)).into());
        }
        let source = if source.is_absolute() {
            source.to_path_buf()
        } else {
            env::current_dir()
                .context("Failed to determine current directory")?
                .join(source)
        };

        let profiles = read_profiles(&source)?;
        for profile in &profiles {
            self.store.add_profile(&profile.name, &source)?;
        }

        let mut activated = false;
        if self.store.active_profile().is_none() {
            if let Some(first) = profiles.first() {
                self.store.set_active_profile(&first.name)?;
                activated = true;
            }
        }

        Ok((profiles, activated))
    }

    /// Load the active profile's declarations from its source file.
    pub fn active_profile(&self) -> Result<Profile> {
        let name = self.store.active_profile().ok_or_else(|| {
            RaidError::NotFound(
                "no active profile set. Use 'raid profile use <profile-name>' to set an active profile"
                    .to_string(),
            )
        })?;
        self.load_profile(name)
    }

    /// Load a registered profile by name.
    pub fn load_profile(&self, name: &str) -> Result<Profile> {
        let source = self
            .store
            .profile_path(name)
            .ok_or_else(|| RaidError::NotFound(format!("profile '{name}' not found")))?;

        let profile = read_profiles(source)
            .with_context(|| format!("Failed to read profile '{name}' from {:?}", source))?
            .into_iter()
            .find(|profile| profile.name == name)
            .ok_or_else(|| {
                RaidError::NotFound(format!("profile '{name}' is no longer declared in {:?}", source))
            })?;

        Ok(profile)
    }
}
