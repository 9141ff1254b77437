use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{RaidError, Result};

/// Key holding the active profile name.
pub const ACTIVE_PROFILE_KEY: &str = "profile";
/// Key holding the name -> source file map.
pub const ALL_PROFILES_KEY: &str = "profiles";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoreData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    profile: Option<String>,
    #[serde(default)]
    profiles: BTreeMap<String, PathBuf>,
}

/// Persistent profile registry backed by a TOML file.
///
/// Every mutation is written to disk before the call returns.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    data: StoreData,
}

impl ProfileStore {
    /// Load the store at `path`; a missing or blank file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|err| RaidError::io("failed to read config file", path, err))?;
            if contents.trim().is_empty() {
                StoreData::default()
            } else {
                toml::from_str(&contents).map_err(|err| {
                    RaidError::Parse(format!("failed to parse config file {:?}: {err}", path))
                })?
            }
        } else {
            StoreData::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<toml::Value> {
        match key {
            ACTIVE_PROFILE_KEY => self.data.profile.clone().map(toml::Value::String),
            ALL_PROFILES_KEY => {
                let table = self
                    .data
                    .profiles
                    .iter()
                    .map(|(name, path)| {
                        (
                            name.clone(),
                            toml::Value::String(path.to_string_lossy().into_owned()),
                        )
                    })
                    .collect();
                Some(toml::Value::Table(table))
            }
            _ => None,
        }
    }

    /// Replace the value stored under `key` and persist immediately.
    pub fn set(&mut self, key: &str, value: toml::Value) -> Result<()> {
        let invalid = || RaidError::Parse(format!("invalid value for config key '{key}'"));
        match key {
            ACTIVE_PROFILE_KEY => {
                let name = value.as_str().ok_or_else(invalid)?;
                self.data.profile = Some(name.to_string());
            }
            ALL_PROFILES_KEY => {
                let table = value.as_table().ok_or_else(invalid)?;
                let mut profiles = BTreeMap::new();
                for (name, path) in table {
                    let path = path.as_str().ok_or_else(invalid)?;
                    profiles.insert(name.clone(), PathBuf::from(path));
                }
                self.data.profiles = profiles;
            }
            _ => return Err(RaidError::NotFound(format!("unknown config key '{key}'"))),
        }
        self.save()
    }

    pub fn active_profile(&self) -> Option<&str> {
        self.data
            .profile
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    pub fn set_active_profile(&mut self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(RaidError::NotFound(format!(
                "profile '{name}' not found. Use 'raid profile list' to see available profiles"
            )));
        }
        self.data.profile = Some(name.to_string());
        self.save()
    }

    /// Registered profiles, sorted by name.
    pub fn profiles(&self) -> &BTreeMap<String, PathBuf> {
        &self.data.profiles
    }

    pub fn profile_path(&self, name: &str) -> Option<&Path> {
        self.data.profiles.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.profiles.contains_key(name)
    }

    /// Register `name` as living in `source`, replacing any previous entry.
    pub fn add_profile(&mut self, name: &str, source: &Path) -> Result<()> {
        self.data
            .profiles
            .insert(name.to_string(), source.to_path_buf());
        self.save()
    }

    pub fn remove_profile(&mut self, name: &str) -> Result<()> {
        if self.data.profiles.remove(name).is_none() {
            return Err(RaidError::NotFound(format!("profile '{name}' not found")));
        }
        if self.data.profile.as_deref() == Some(name) {
            self.data.profile = None;
        }
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| RaidError::io("failed to create config directory", parent, err))?;
        }

        let contents = toml::to_string_pretty(&self.data)
            .map_err(|err| RaidError::Parse(format!("failed to serialize config: {err}")))?;
        fs::write(&self.path, contents)
            .map_err(|err| RaidError::io("failed to write config file", &self.path, err))?;
        debug!(path = %self.path.display(), "saved profile store");
        Ok(())
    }
}
