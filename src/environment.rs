use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{RaidError, Result};
use crate::profile::{read_profiles, Environment, Profile};
use crate::ui;

/// Repository-local config files, in probe order.
pub const REPOSITORY_CONFIG_FILES: [&str; 3] = ["raid.yaml", "raid.yml", "raid.json"];

/// Where a matched environment was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Profile,
    Repository { name: String, root: PathBuf },
}

impl Scope {
    /// Directory relative task paths resolve against, if the scope has one.
    pub fn root(&self) -> Option<&Path> {
        match self {
            Scope::Profile => None,
            Scope::Repository { root, .. } => Some(root),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Profile => write!(f, "profile"),
            Scope::Repository { name, .. } => write!(f, "repository '{name}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentMatch {
    pub scope: Scope,
    pub environment: Environment,
}

/// Find every declaration of environment `name` for `profile`.
///
/// The profile's own environments come first, then each repository's local
/// config in declaration order. Matches are independent; nothing is merged.
pub fn resolve(profile: &Profile, name: &str) -> Vec<EnvironmentMatch> {
    let mut matches = Vec::new();

    if let Some(environment) = profile.environment(name) {
        debug!(environment = name, "found environment in profile");
        matches.push(EnvironmentMatch {
            scope: Scope::Profile,
            environment: environment.clone(),
        });
    }

    for repository in &profile.repositories {
        let root = repository.expanded_path();
        let Some(config) = repository_config(&root) else {
            warn!(repository = %repository.name, root = %root.display(), "skipping repository without config");
            ui::warn(format!(
                "repository '{}' has no {} at {}, skipping",
                repository.name,
                REPOSITORY_CONFIG_FILES.join(" or "),
                root.display()
            ));
            continue;
        };

        let declared = match read_profiles(&config) {
            Ok(declared) => declared,
            Err(err) => {
                warn!(config = %config.display(), error = %err, "skipping unreadable repository config");
                ui::warn(format!("failed to read repository config {}: {err}", config.display()));
                continue;
            }
        };

        if let Some(environment) = declared.iter().find_map(|local| local.environment(name)) {
            debug!(repository = %repository.name, environment = name, "found environment in repository");
            matches.push(EnvironmentMatch {
                scope: Scope::Repository {
                    name: repository.name.clone(),
                    root: root.clone(),
                },
                environment: environment.clone(),
            });
        }
    }

    matches
}

/// Like [`resolve`], but an environment declared nowhere is an error.
pub fn resolve_required(profile: &Profile, name: &str) -> Result<Vec<EnvironmentMatch>> {
    let matches = resolve(profile, name);
    if matches.is_empty() {
        return Err(RaidError::NotFound(format!(
            "environment '{name}' not found in profile '{}' or any of its repositories",
            profile.name
        )));
    }
    Ok(matches)
}

/// First existing repository config file under `root`.
pub fn repository_config(root: &Path) -> Option<PathBuf> {
    REPOSITORY_CONFIG_FILES
        .iter()
        .map(|file| root.join(file))
        .find(|candidate| candidate.is_file())
}
